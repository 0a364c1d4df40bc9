//! Templates embedded in the binary for `init`.

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.md"]
#[include = "*.toml"]
struct Templates;

pub fn get_template(name: &str) -> Option<String> {
    let file = Templates::get(name)?;
    Some(String::from_utf8_lossy(&file.data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ResolverConfig;

    #[test]
    fn templates_are_embedded() {
        let mut names: Vec<String> = Templates::iter().map(|n| n.into_owned()).collect();
        names.sort();
        assert_eq!(names, ["LIBRARY.md", "OVERRIDES.md", "config.toml"]);
        assert!(get_template("missing.md").is_none());
    }

    #[test]
    fn config_template_is_the_default_config() {
        let raw = get_template("config.toml").unwrap();
        assert_eq!(
            ResolverConfig::from_toml(&raw).unwrap(),
            ResolverConfig::default()
        );
    }
}
