//! Runtime configuration, threaded by reference from the CLI into the
//! level builder and the search driver.

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub max_dim: usize,
    pub use_hungarian: bool,
    pub max_search: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_dim: 50,
            use_hungarian: false,
            max_search: 300_000,
        }
    }
}
