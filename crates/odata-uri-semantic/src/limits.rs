//! Resource limits enforced while walking paths and binding options

use odata_uri_diagnostics::{OD0500, OD0501, OD0502, OD0503, Result, UriError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionLimits {
    pub max_segments: usize,
    pub max_expand_depth: usize,
    pub max_expand_count: usize,
    pub max_lambda_depth: usize,
}

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self {
            max_segments: 100,
            max_expand_depth: 8,
            max_expand_count: 100,
            max_lambda_depth: 8,
        }
    }
}

impl ResolutionLimits {
    pub fn check_segments(&self, count: usize) -> Result<()> {
        if count > self.max_segments {
            return Err(UriError::limit(
                OD0500,
                format!("Path has {} segments; the limit is {}", count, self.max_segments),
            ));
        }
        Ok(())
    }

    pub fn check_expand_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_expand_depth {
            return Err(UriError::limit(
                OD0501,
                format!("$expand nesting depth {} exceeds {}", depth, self.max_expand_depth),
            ));
        }
        Ok(())
    }

    pub fn check_expand_count(&self, count: usize) -> Result<()> {
        if count > self.max_expand_count {
            return Err(UriError::limit(
                OD0502,
                format!("{} expand items exceed the limit of {}", count, self.max_expand_count),
            ));
        }
        Ok(())
    }

    pub fn check_lambda_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_lambda_depth {
            return Err(UriError::limit(
                OD0503,
                format!("Lambda nesting depth {} exceeds {}", depth, self.max_lambda_depth),
            ));
        }
        Ok(())
    }
}
