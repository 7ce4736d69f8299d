use std::collections::HashMap;

#[derive(PartialEq, Debug)]
pub struct QueryString {
    items: HashMap<String, String>,
}

impl QueryString {
    pub fn from(buf: &str) -> Self {
        let vs: Vec<(String, String)> = serde_urlencoded::from_str(buf).unwrap_or_else(|_| vec![]);
        let items: HashMap<String, String> = vs.into_iter().collect();

        QueryString {
            items,
        }
    }

    /// The front page number. Zero-based; anything unparseable is page 0.
    pub fn get_page(&self) -> usize {
        let zero = "0".to_string();
        let val = self.items.get("page").unwrap_or(&zero);
        val.parse().unwrap_or(0)
    }
}
