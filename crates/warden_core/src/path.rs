//! Path canonicalization for filesystem-shaped requests.
//!
//! All paths handled by the mediator are absolute, `/`-separated, and free of
//! `.`/`..` components and repeated separators once canonical. Canonicalization
//! is purely lexical; the mediator never consults the real filesystem.

/// Normalize an absolute path by resolving `.` and `..` and removing
/// redundant separators.
///
/// Returns `None` for empty or relative input, embedded NUL bytes, and any
/// path that climbs above the root.
///
/// # Examples
///
/// ```
/// use warden_core::path::normalize;
///
/// assert_eq!(normalize("/players//bob/./x/../bob.o").as_deref(), Some("/players/bob/bob.o"));
/// assert_eq!(normalize("/"), Some("/".to_string()));
/// assert_eq!(normalize("/../etc"), None);
/// assert_eq!(normalize("relative"), None);
/// ```
pub fn normalize(path: &str) -> Option<String> {
    if !path.starts_with('/') || path.contains('\0') {
        return None;
    }

    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                components.pop()?;
            }
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return Some("/".to_string());
    }

    let mut result = String::with_capacity(path.len());
    for component in components {
        result.push('/');
        result.push_str(component);
    }
    Some(result)
}

/// Join a relative path onto an absolute base.
pub fn join(base: &str, relative: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, relative)
    } else {
        format!("{}/{}", base, relative)
    }
}

/// Check if a canonical path lies at or below a canonical base.
///
/// # Examples
///
/// ```
/// use warden_core::path::is_under;
///
/// assert!(is_under("/players/bob/x.c", "/players/bob"));
/// assert!(is_under("/players/bob", "/players/bob"));
/// assert!(!is_under("/players/bobby/x.c", "/players/bob"));
/// assert!(is_under("/anything", "/"));
/// ```
pub fn is_under(path: &str, base: &str) -> bool {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return path.starts_with('/');
    }
    path.starts_with(base) && (path.len() == base.len() || path.as_bytes()[base.len()] == b'/')
}

/// First component below `root`, e.g. the owner name in `/players/<name>/...`.
pub fn component_below<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if !is_under(path, root) {
        return None;
    }
    let rest = path[root.trim_end_matches('/').len()..].trim_start_matches('/');
    rest.split('/').next().filter(|name| !name.is_empty())
}

/// Strip a clone suffix (`#<n>`) from an instance path.
pub fn blueprint_path(instance: &str) -> &str {
    match instance.rfind('#') {
        Some(pos) => &instance[..pos],
        None => instance,
    }
}

/// Compiled-program name for an instance path: no leading separator, no
/// clone suffix, `.c` appended.
///
/// # Examples
///
/// ```
/// use warden_core::path::program_name;
///
/// assert_eq!(program_name("/obj/player#12"), "obj/player.c");
/// assert_eq!(program_name("/secure/login.c"), "secure/login.c");
/// ```
pub fn program_name(instance: &str) -> String {
    let base = blueprint_path(instance).trim_start_matches('/');
    if base.ends_with(".c") {
        base.to_string()
    } else {
        format!("{}.c", base)
    }
}

/// Instance path for a program name or path: leading separator, no `.c`.
pub fn object_path(program: &str) -> String {
    let trimmed = program.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix(".c").unwrap_or(trimmed);
    format!("/{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rejects_nul() {
        assert_eq!(normalize("/players/bob\0/x"), None);
    }

    #[test]
    fn test_normalize_collapses_to_root() {
        assert_eq!(normalize("/players/.."), Some("/".to_string()));
        assert_eq!(normalize("///"), Some("/".to_string()));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/players/bob", "x.c"), "/players/bob/x.c");
        assert_eq!(join("/", "x.c"), "/x.c");
    }

    #[test]
    fn test_component_below() {
        assert_eq!(component_below("/players/bob/x.c", "/players"), Some("bob"));
        assert_eq!(component_below("/players/bob", "/players/"), Some("bob"));
        assert_eq!(component_below("/players", "/players"), None);
        assert_eq!(component_below("/domains/x", "/players"), None);
    }

    #[test]
    fn test_program_and_object_paths() {
        assert_eq!(program_name("/obj/player"), "obj/player.c");
        assert_eq!(object_path("obj/player.c"), "/obj/player");
        assert_eq!(object_path("/secure/login"), "/secure/login");
        assert_eq!(blueprint_path("/obj/torch#3"), "/obj/torch");
    }
}
