/// Maps stored file names to client-reachable URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrls {
    domain: String,
}

impl PublicUrls {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.trim_end_matches('/').to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn attachment_url(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.domain, filename)
    }

    /// Absolute URL for a path such as a snapshot's public path.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}/{}", self.domain, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash() {
        let urls = PublicUrls::new("https://dea.example.ar/");
        assert_eq!(urls.domain(), "https://dea.example.ar");
        assert_eq!(
            urls.attachment_url("1-2.png"),
            "https://dea.example.ar/uploads/1-2.png"
        );
    }

    #[test]
    fn absolute_joins_paths() {
        let urls = PublicUrls::new("http://localhost:3001");
        assert_eq!(
            urls.absolute("/uploads/planillas/p.json"),
            "http://localhost:3001/uploads/planillas/p.json"
        );
    }
}
