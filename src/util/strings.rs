//! Quoting, path-separator and file-name helpers shared by the generator.
//!
//! Paths in project files are plain strings that may come from either
//! platform, so these helpers treat both `/` and `\` as separators instead
//! of going through `std::path`.

/// Wrap `s` in double quotes if it contains a space and is not already quoted.
pub fn quote_if_needed(s: &str) -> String {
    if s.contains(' ') && !s.starts_with('"') {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote_if_needed(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Replace backslashes with forward slashes when `force_fwd_slashes` is set.
///
/// A backslash immediately followed by a space is an escaped space and is
/// left alone.
pub fn fix_path_separators(s: &str, force_fwd_slashes: bool) -> String {
    if !force_fwd_slashes {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() != Some(&' ') {
            out.push('/');
        } else {
            out.push(c);
        }
    }
    out
}

/// Join items, emitting `sep` after every item (including the last one).
pub fn string_from_array<S: AsRef<str>>(items: &[S], sep: &str) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(item.as_ref());
        out.push_str(sep);
    }
    out
}

/// Normalize separators to the host platform's native one.
pub fn unix_filename(s: &str) -> String {
    if cfg!(windows) {
        s.replace('/', "\\")
    } else {
        s.replace('\\', "/")
    }
}

/// A file name split into directory, base name and extension.
///
/// `dir` never carries a trailing separator. A leading dot (".objs") is part
/// of the name, not an extension separator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileName {
    pub dir: String,
    pub name: String,
    pub ext: String,
    sep: char,
}

impl FileName {
    /// Split `path` on the last `/` or `\`, then on the last `.` of the file part.
    pub fn parse(path: &str) -> Self {
        let (dir, file, sep) = match path.rfind(|c: char| c == '/' || c == '\\') {
            Some(idx) => {
                let sep = path[idx..].chars().next().unwrap_or('/');
                (&path[..idx], &path[idx + 1..], sep)
            }
            None => ("", path, '/'),
        };

        let (name, ext) = match file.rfind('.') {
            Some(idx) if idx > 0 => (&file[..idx], &file[idx + 1..]),
            _ => (file, ""),
        };

        FileName {
            dir: dir.to_string(),
            name: name.to_string(),
            ext: ext.to_string(),
            sep,
        }
    }

    /// Name plus extension, without the directory.
    pub fn full_name(&self) -> String {
        if self.ext.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.ext)
        }
    }

    /// Directory followed by a separator, or empty if there is no directory.
    pub fn dir_with_sep(&self) -> String {
        if self.dir.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.dir, self.sep)
        }
    }

    /// Rebuild the full path.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.dir_with_sep(), self.full_name())
    }

    pub fn set_ext(&mut self, ext: impl Into<String>) {
        self.ext = ext.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// True for paths that start at a root (`/x`, `\x`, `C:\x`).
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/'))
}
