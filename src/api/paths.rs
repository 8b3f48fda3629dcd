//! All Paths are recorded here for use throughout this codebase
use url::Url;

pub mod base {
    pub const ROOT: &str = "/";
}

pub mod peers {
    pub const LIST: &str = "/peer";
    pub const ITEM: &str = "/peer/:id";
    pub const IMPORT: &str = "/peer-list/import";
}

pub const SECRET: &str = "/secret";

pub fn peer_path(id: u64) -> String {
    peers::ITEM.replace(":id", &id.to_string())
}

/// `path` on the node at `base`. Any path already on `base` is kept as a prefix.
pub fn endpoint(base: &Url, path: &str) -> Url {
    let mut joined = base.clone();
    let prefix = base.path().trim_end_matches('/');
    joined.set_path(&format!("{}{}", prefix, path));
    joined.set_query(None);
    joined.set_fragment(None);
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let base = Url::parse("http://127.0.0.1:5001").unwrap();
        assert_eq!(
            endpoint(&base, SECRET).as_str(),
            "http://127.0.0.1:5001/secret"
        );
        let proxied = Url::parse("https://example.com/node-a/").unwrap();
        assert_eq!(
            endpoint(&proxied, peers::LIST).as_str(),
            "https://example.com/node-a/peer"
        );
    }

    #[test]
    fn test_peer_path() {
        assert_eq!(peer_path(42), "/peer/42");
    }
}
