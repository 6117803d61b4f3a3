use std::fmt;

/// Which button produced a request.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    HallUp = 0,
    HallDown = 1,
    Cab = 2,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Call::HallUp => "hall up",
            Call::HallDown => "hall down",
            Call::Cab => "cab",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_button() {
        assert_eq!(Call::HallUp.to_string(), "hall up");
        assert_eq!(Call::Cab.to_string(), "cab");
    }
}
