use serde::Deserialize;

const DEFAULT_TAKE: u64 = 10;
const MAX_TAKE: u64 = 100;

/// Offset pagination used by every listing endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PaginationParams {
    pub take: Option<u64>,
    pub skip: Option<u64>,
}

impl PaginationParams {
    pub fn take(&self) -> u64 {
        self.take.unwrap_or(DEFAULT_TAKE).min(MAX_TAKE)
    }

    pub fn skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_take_and_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.take(), 10);
        assert_eq!(params.skip(), 0);

        let params = PaginationParams {
            take: Some(5000),
            skip: Some(30),
        };
        assert_eq!(params.take(), 100);
        assert_eq!(params.skip(), 30);
    }
}
