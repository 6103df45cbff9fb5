use crate::error::{Error, Result};

/// Upper bound on workers a single pool may spawn.
pub const MAX_WORKERS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_concurrent_workers: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_workers: 2,
            thread_name_prefix: "callpool-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_workers == 0 {
            return Err(Error::config("max_concurrent_workers must be > 0"));
        }
        if self.max_concurrent_workers > MAX_WORKERS {
            return Err(Error::config(format!(
                "max_concurrent_workers too large (max {})",
                MAX_WORKERS
            )));
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(Error::config("thread_name_prefix must not contain NUL"));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn max_concurrent_workers(mut self, n: usize) -> Self {
        self.config.max_concurrent_workers = n;
        self
    }

    /// One worker per logical CPU.
    pub fn available_parallelism(mut self) -> Self {
        self.config.max_concurrent_workers = num_cpus::get();
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_two_workers() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_workers, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_workers() {
        let result = Config::builder().max_concurrent_workers(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_too_many_workers() {
        let result = Config::builder()
            .max_concurrent_workers(MAX_WORKERS + 1)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_bad_prefix() {
        assert!(Config::builder().thread_name_prefix("").build().is_err());
        assert!(Config::builder().thread_name_prefix("a\0b").build().is_err());
    }

    #[test]
    fn test_available_parallelism() {
        let config = Config::builder().available_parallelism().build().unwrap();
        assert_eq!(config.max_concurrent_workers, num_cpus::get());
    }
}
