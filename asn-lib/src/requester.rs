fixed_bytes!(
    /// correlation token of a request, echoed back in its acknowledgment
    Requester,
    8
);

impl From<u64> for Requester {
    fn from(token: u64) -> Self {
        Self::from_bytes(token.to_be_bytes())
    }
}

impl From<Requester> for u64 {
    fn from(requester: Requester) -> Self {
        u64::from_be_bytes(*requester.as_bytes())
    }
}
