use once_cell::sync::Lazy;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct BuiltinLists {
    #[serde(default)]
    pub global_ignore: Vec<String>,
    #[serde(default)]
    pub library_blacklist: Vec<String>,
    #[serde(default)]
    pub default_include_extensions: Vec<String>,
    #[serde(default)]
    pub default_ignore_dirs: Vec<String>,
    #[serde(default)]
    pub main_code_extensions: Vec<String>,
    #[serde(default)]
    pub config_extensions: Vec<String>,
}

static BUILTIN_LISTS: Lazy<BuiltinLists> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/builtin.yaml"));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin.yaml")
});

pub fn get_builtin_lists() -> &'static BuiltinLists {
    &BUILTIN_LISTS
}

impl BuiltinLists {
    pub fn is_main_code_extension(&self, ext: &str) -> bool {
        contains_extension(&self.main_code_extensions, ext)
    }

    pub fn is_config_extension(&self, ext: &str) -> bool {
        contains_extension(&self.config_extensions, ext)
    }
}

/// Case-insensitive membership test for dotted extensions (`.rs`).
pub fn contains_extension(list: &[String], ext: &str) -> bool {
    list.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_lists_parse() {
        let lists = get_builtin_lists();
        assert!(lists.library_blacklist.iter().any(|p| p == "**/node_modules/**"));
        assert!(lists.global_ignore.iter().any(|p| p == ".xtools/**"));
        assert!(lists.is_main_code_extension(".RS"));
        assert!(lists.is_config_extension(".toml"));
        assert!(!lists.is_config_extension(".rs"));
    }

    #[test]
    fn code_and_config_sets_do_not_overlap() {
        let lists = get_builtin_lists();
        for ext in &lists.main_code_extensions {
            assert!(!lists.is_config_extension(ext), "{} is in both sets", ext);
        }
    }
}
