//! `${VAR}` and `${VAR:-default}` expansion for string values.

use crate::ConfigError;

pub(crate) fn expand_env(value: &str, field: &'static str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::UnsetVar {
            field,
            var: e.var_name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(
            expand_env("https://docs.example.com", "sitemap.site_url").unwrap(),
            "https://docs.example.com"
        );
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env(
            "${DOCXES_TEST_SURELY_UNSET_VAR:-http://localhost:3000}",
            "sitemap.site_url",
        )
        .unwrap();
        assert_eq!(value, "http://localhost:3000");
    }

    #[test]
    fn test_unset_without_default_errors() {
        let err = expand_env("${DOCXES_TEST_SURELY_UNSET_VAR}", "sitemap.site_url").unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::UnsetVar { field: "sitemap.site_url", var } if var == "DOCXES_TEST_SURELY_UNSET_VAR"
        ));
        assert_eq!(
            err.to_string(),
            "sitemap.site_url: environment variable DOCXES_TEST_SURELY_UNSET_VAR is not set"
        );
    }
}
