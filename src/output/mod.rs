//! Output formatting for CLI results

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use hawkcache::Response;

use crate::cli::OutputFormat;

pub mod json;
pub mod table;

/// One completed call, as shown by `fetch` and `replay`
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CallRow {
    #[tabled(rename = "#")]
    pub index: usize,

    #[tabled(rename = "METHOD")]
    pub method: String,

    #[tabled(rename = "URL")]
    pub url: String,

    #[tabled(rename = "SOURCE")]
    pub source: String,

    #[tabled(rename = "STATUS")]
    pub status: u16,

    #[tabled(skip)]
    pub data: serde_json::Value,
}

impl CallRow {
    pub fn from_response(index: usize, response: &Response) -> Self {
        Self {
            index,
            method: response.config.method.to_string(),
            url: response.config.url.clone(),
            source: if response.from_cache { "cache" } else { "network" }.to_string(),
            status: response.status.as_u16(),
            data: response.data.clone(),
        }
    }
}

/// Trait for types that can be formatted for output
pub trait Formattable {
    /// Format the data according to the specified format
    fn format(&self, format: OutputFormat) -> Result<String>;

    /// Format and print to stdout
    fn print(&self, format: OutputFormat) -> Result<()> {
        println!("{}", self.format(format)?);
        Ok(())
    }
}

impl Formattable for Vec<CallRow> {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(table::format_table(self)),
            OutputFormat::Json => Ok(json::format_json(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawkcache::Call;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_call_row_source() {
        let network = Response::new(Call::get("/posts"), StatusCode::OK, json!([]));
        let cached = Response::from_cache(Call::get("/posts"), json!([]));

        assert_eq!(CallRow::from_response(1, &network).source, "network");
        assert_eq!(CallRow::from_response(2, &cached).source, "cache");
        assert_eq!(CallRow::from_response(2, &cached).method, "GET");
    }

    #[test]
    fn test_rows_as_table_hide_data() {
        let response = Response::new(Call::get("/posts"), StatusCode::OK, json!({"secret": 1}));
        let rows = vec![CallRow::from_response(1, &response)];

        let out = rows.format(OutputFormat::Table).unwrap();
        assert!(out.contains("/posts"));
        assert!(out.contains("network"));
        assert!(!out.contains("secret"));

        let out = rows.format(OutputFormat::Json).unwrap();
        assert!(out.contains("\"secret\": 1"));
    }
}
