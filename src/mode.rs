use anyhow::bail;

/// Selects which detector runs on each frame and which overlay is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    None,
    Hands,
    Face,
    Pose,
    Count,
    Draw,
    Gestures,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::None,
        Mode::Hands,
        Mode::Face,
        Mode::Pose,
        Mode::Count,
        Mode::Draw,
        Mode::Gestures,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mode::None => "none",
            Mode::Hands => "hands",
            Mode::Face => "face",
            Mode::Pose => "pose",
            Mode::Count => "count",
            Mode::Draw => "draw",
            Mode::Gestures => "gestures",
        }
    }

    // keyboard shortcut that switches to this mode
    pub fn key(&self) -> char {
        match self {
            Mode::None => 'n',
            Mode::Hands => 'h',
            Mode::Face => 'f',
            Mode::Pose => 'p',
            Mode::Count => 'c',
            Mode::Draw => 'd',
            Mode::Gestures => 'v',
        }
    }

    pub fn from_key(key: char) -> Option<Mode> {
        Mode::ALL.into_iter().find(|mode| mode.key() == key)
    }

    pub fn needs_hands(&self) -> bool {
        matches!(self, Mode::Hands | Mode::Count | Mode::Draw | Mode::Gestures)
    }
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.to_ascii_lowercase();
        match Mode::ALL.into_iter().find(|mode| mode.label() == s) {
            Some(mode) => Ok(mode),
            None => bail!("unknown mode \"{}\"", s),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_key(mode.key()), Some(mode));
        }
        assert_eq!(Mode::from_key('z'), None);
    }

    #[test]
    fn parse_from_label() {
        assert_eq!("Draw".parse::<Mode>().unwrap(), Mode::Draw);
        assert_eq!("gestures".parse::<Mode>().unwrap(), Mode::Gestures);
        assert!("volume".parse::<Mode>().is_err());
    }

    #[test]
    fn only_hand_modes_need_the_hand_model() {
        let hand_modes: Vec<Mode> = Mode::ALL.into_iter().filter(|m| m.needs_hands()).collect();
        assert_eq!(hand_modes, vec![Mode::Hands, Mode::Count, Mode::Draw, Mode::Gestures]);
    }
}
