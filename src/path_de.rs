use serde::de::DeserializeOwned;

/// Deserialize YAML with document-path context in error messages.
pub fn from_yaml_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = serde_yaml::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at path {path} → {}", err.into_inner()))
        }
    }
}

/// Deserialize JSON with JSON-path context in error messages.
pub fn from_json_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn yaml_errors_name_the_offending_path() {
        let src = "a:\n  b: not-a-number\n";
        let err = from_yaml_str_with_path::<BTreeMap<String, BTreeMap<String, u32>>>(src).unwrap_err();
        assert!(err.starts_with("at path a.b"), "{err}");
    }

    #[test]
    fn json_errors_name_the_offending_path() {
        let err = from_json_str_with_path::<BTreeMap<String, Vec<u32>>>(r#"{"xs": [1, "two"]}"#).unwrap_err();
        assert!(err.contains("xs[1]"), "{err}");
    }
}
