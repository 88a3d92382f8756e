//! Module tables and near-miss suggestions.

pub(crate) const STDLIB_MODULES: &[&str] = &[
    "__future__", "_thread", "abc", "aifc", "argparse", "array", "ast", "asynchat", "asyncio",
    "asyncore", "atexit", "audioop", "base64", "bdb", "binascii", "binhex", "bisect",
    "builtins", "bz2", "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code", "codecs",
    "codeop", "collections", "colorsys", "compileall", "concurrent", "configparser",
    "contextlib", "contextvars", "copy", "copyreg", "cProfile", "crypt", "csv", "ctypes",
    "curses", "dataclasses", "datetime", "dbm", "decimal", "difflib", "dis", "distutils",
    "doctest", "email", "encodings", "enum", "errno", "faulthandler", "fcntl", "filecmp",
    "fileinput", "fnmatch", "formatter", "fractions", "ftplib", "functools", "gc", "getopt",
    "getpass", "gettext", "glob", "graphlib", "grp", "gzip", "hashlib", "heapq", "hmac",
    "html", "http", "idlelib", "imaplib", "imghdr", "imp", "importlib", "inspect", "io",
    "ipaddress", "itertools", "json", "keyword", "lib2to3", "linecache", "locale", "logging",
    "lzma", "mailbox", "mailcap", "marshal", "math", "mimetypes", "mmap", "modulefinder",
    "msilib", "msvcrt", "multiprocessing", "netrc", "nis", "nntplib", "numbers", "operator",
    "optparse", "os", "ossaudiodev", "parser", "pathlib", "pdb", "pickle", "pickletools",
    "pipes", "pkgutil", "platform", "plistlib", "poplib", "posix", "posixpath", "pprint",
    "profile", "pstats", "pty", "pwd", "py_compile", "pyclbr", "pydoc", "queue", "quopri",
    "random", "re", "readline", "reprlib", "resource", "rlcompleter", "runpy", "sched",
    "secrets", "select", "selectors", "shelve", "shlex", "shutil", "signal", "site", "smtpd",
    "smtplib", "sndhdr", "socket", "socketserver", "spwd", "sqlite3", "ssl", "stat",
    "statistics", "string", "stringprep", "struct", "subprocess", "sunau", "symbol",
    "symtable", "sys", "sysconfig", "syslog", "tabnanny", "tarfile", "telnetlib", "tempfile",
    "termios", "test", "textwrap", "threading", "time", "timeit", "tkinter", "token",
    "tokenize", "tomllib", "trace", "traceback", "tracemalloc", "tty", "turtle", "turtledemo",
    "types", "typing", "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib",
];

/// Widely used PyPI packages, plus the short aliases they are usually imported as.
pub(crate) const KNOWN_THIRD_PARTY: &[&str] = &[
    "numpy", "np", "pandas", "pd", "requests", "flask", "django", "fastapi", "sqlalchemy",
    "pytest", "scipy", "matplotlib", "plt", "seaborn", "sns", "sklearn", "tensorflow", "tf",
    "torch", "pytorch", "keras", "cv2", "PIL", "pillow", "bs4", "beautifulsoup4", "selenium",
    "scrapy", "celery", "redis", "boto3", "aiohttp", "httpx", "pydantic", "attrs", "click",
    "typer", "rich", "tqdm", "loguru", "black", "flake8", "mypy", "isort", "poetry", "pipenv",
    "dotenv", "jinja2", "werkzeug", "uvicorn", "starlette", "streamlit", "plotly", "dash",
    "altair", "bokeh", "networkx", "statsmodels",
];

/// Common wrong names and what the import should actually be.
const ALIASES: &[(&str, &str)] = &[
    ("opencv", "cv2"),
    ("beautifulsoup", "bs4"),
    ("pillow", "PIL"),
    ("sklearn", "scikit-learn (import as sklearn)"),
    ("tensorflow", "tf (if using alias)"),
];

const SIMILARITY_THRESHOLD: usize = 2;

pub(crate) fn is_stdlib(top_level: &str) -> bool {
    STDLIB_MODULES.contains(&top_level)
}

pub(crate) fn is_known_third_party(top_level: &str) -> bool {
    KNOWN_THIRD_PARTY
        .iter()
        .any(|known| known.eq_ignore_ascii_case(top_level))
}

/// A hint for an unknown module: alias table first, then the closest
/// standard-library name, then the closest third-party name.
pub(crate) fn suggest(module: &str) -> String {
    let lower = module.to_ascii_lowercase();
    if let Some((_, target)) = ALIASES.iter().find(|(wrong, _)| *wrong == lower) {
        return format!("Did you mean '{target}'?");
    }

    let closest = |table: &'static [&'static str]| {
        table
            .iter()
            .filter_map(|candidate| distance(&lower, candidate).map(|d| (d, *candidate)))
            .min_by_key(|(d, _)| *d)
    };

    if let Some((_, stdlib)) = closest(STDLIB_MODULES) {
        return format!("Did you mean '{stdlib}' from standard library?");
    }
    if let Some((_, third_party)) = closest(KNOWN_THIRD_PARTY) {
        return format!("Did you mean '{third_party}'? (requires installation)");
    }
    "Consider using a standard library alternative or ensure the package is installed".into()
}

/// Edit distance between `name` and `candidate` when it is within the
/// similarity threshold. Containment counts as the length difference.
fn distance(name: &str, candidate: &str) -> Option<usize> {
    let candidate = candidate.to_ascii_lowercase();
    if name.len().abs_diff(candidate.len()) > SIMILARITY_THRESHOLD {
        return None;
    }
    if name.contains(candidate.as_str()) || candidate.contains(name) {
        return Some(name.len().abs_diff(candidate.len()));
    }
    let d = levenshtein(name, &candidate);
    (d <= SIMILARITY_THRESHOLD).then_some(d)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_classify_modules() {
        assert!(is_stdlib("os"));
        assert!(is_stdlib("__future__"));
        assert!(!is_stdlib("numpy"));
        assert!(is_known_third_party("numpy"));
        assert!(is_known_third_party("pil"));
        assert!(!is_known_third_party("automagic_parser"));
    }

    #[test]
    fn levenshtein_counts_edits() {
        assert_eq!(levenshtein("json", "json"), 0);
        assert_eq!(levenshtein("jsn", "json"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn alias_table_wins() {
        assert_eq!(suggest("opencv"), "Did you mean 'cv2'?");
    }

    #[test]
    fn typo_finds_closest_module() {
        assert_eq!(suggest("jsn"), "Did you mean 'json' from standard library?");
        assert_eq!(suggest("requets"), "Did you mean 'requests'? (requires installation)");
    }

    #[test]
    fn unrelated_name_gets_generic_hint() {
        assert_eq!(
            suggest("automagic_parser"),
            "Consider using a standard library alternative or ensure the package is installed"
        );
    }
}
