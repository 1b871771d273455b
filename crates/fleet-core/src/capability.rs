//! Capability tags a worker advertises.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A model family or auxiliary operation a worker can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Sd15,
    Sdxl,
    Pony,
    Illustrious,
    Flux,
    FluxFp8,
    Upscale,
    Controlnet,
    Ipadapter,
    Faceid,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Sd15 => "sd15",
            Capability::Sdxl => "sdxl",
            Capability::Pony => "pony",
            Capability::Illustrious => "illustrious",
            Capability::Flux => "flux",
            Capability::FluxFp8 => "flux_fp8",
            Capability::Upscale => "upscale",
            Capability::Controlnet => "controlnet",
            Capability::Ipadapter => "ipadapter",
            Capability::Faceid => "faceid",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sd15" => Ok(Capability::Sd15),
            "sdxl" => Ok(Capability::Sdxl),
            "pony" => Ok(Capability::Pony),
            "illustrious" => Ok(Capability::Illustrious),
            "flux" => Ok(Capability::Flux),
            "flux_fp8" => Ok(Capability::FluxFp8),
            "upscale" => Ok(Capability::Upscale),
            "controlnet" => Ok(Capability::Controlnet),
            "ipadapter" => Ok(Capability::Ipadapter),
            "faceid" => Ok(Capability::Faceid),
            other => Err(format!("unknown capability '{other}'")),
        }
    }
}
