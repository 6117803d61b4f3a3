use std::fmt;

/// Floor number as printed on the buttons.
pub type Floor = u8;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarId(pub u8);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "car#{}", self.0)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Hands out request ids in increasing order. Owned by whoever creates
/// requests (the dispatcher in a running building).
#[derive(Debug, Default, Clone)]
pub struct RequestIdGenerator {
    next: u64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        RequestIdGenerator { next: 1 }
    }

    pub fn next_id(&mut self) -> RequestId {
        let id = RequestId(self.next.max(1));
        self.next = id.0 + 1;
        id
    }
}
