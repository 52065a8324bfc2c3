/// Variables from `vars` whose names start with any of `prefixes`, sorted by
/// name. An empty prefix list selects nothing.
pub fn filter_vars<I>(vars: I, prefixes: &[String]) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    if prefixes.is_empty() {
        return Vec::new();
    }
    let mut selected: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(name, _)| prefixes.iter().any(|p| name.starts_with(p.as_str())))
        .collect();
    selected.sort_by(|a, b| a.0.cmp(&b.0));
    selected
}

/// Allow-listed variables of the current process. Variables that are not
/// valid UTF-8 are skipped.
pub fn process_vars(prefixes: &[String]) -> Vec<(String, String)> {
    if prefixes.is_empty() {
        return Vec::new();
    }
    let vars = std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
    filter_vars(vars, prefixes)
}
