#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Game {
    #[serde(rename = "BL1")]
    Bl1,
    #[serde(rename = "BL2")]
    Bl2,
    #[serde(rename = "TPS")]
    Tps,
    #[serde(rename = "BL3")]
    Bl3,
    #[serde(rename = "WONDERLANDS")]
    Wonderlands,
    #[serde(rename = "BL4")]
    Bl4,
}

impl Game {
    /// The value written into the store's `game` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bl1 => "BL1",
            Self::Bl2 => "BL2",
            Self::Tps => "TPS",
            Self::Bl3 => "BL3",
            Self::Wonderlands => "WONDERLANDS",
            Self::Bl4 => "BL4",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Bl1 => "bl1",
            Self::Bl2 => "bl2",
            Self::Tps => "tps",
            Self::Bl3 => "bl3",
            Self::Wonderlands => "wonderlands",
            Self::Bl4 => "bl4",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bl1 => "Borderlands",
            Self::Bl2 => "Borderlands 2",
            Self::Tps => "Borderlands: The Pre-Sequel",
            Self::Bl3 => "Borderlands 3",
            Self::Wonderlands => "Tiny Tina's Wonderlands",
            Self::Bl4 => "Borderlands 4",
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
