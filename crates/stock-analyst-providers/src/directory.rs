use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use stock_analyst_core::directory::{Instrument, InstrumentDirectory};
use tracing::debug;

use crate::error::ProviderError;

/// Load an instrument listing from a CSV file.
pub async fn load_directory(path: &Path) -> Result<InstrumentDirectory, ProviderError> {
    let text = tokio::fs::read_to_string(path).await?;
    let directory = parse_directory_csv(&text)?;
    debug!(
        "loaded {} instrument(s) from {}",
        directory.len(),
        path.display()
    );
    Ok(directory)
}

/// Parse an instrument CSV. The header must name `segment`, `name` and `instrument_key`
/// columns, in any order and among any others. Rows missing one of them are dropped.
pub fn parse_directory_csv(text: &str) -> Result<InstrumentDirectory, ProviderError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(ProviderError::Parse("empty CSV".into()));
    }
    let segment_idx = column(&headers, "segment")?;
    let name_idx = column(&headers, "name")?;
    let key_idx = column(&headers, "instrument_key")?;

    let mut instruments = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        instruments.push(Instrument {
            segment: field(segment_idx),
            name: field(name_idx),
            instrument_key: field(key_idx),
        });
    }

    Ok(InstrumentDirectory::new(instruments))
}

fn column(headers: &StringRecord, name: &str) -> Result<usize, ProviderError> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        .ok_or_else(|| ProviderError::Parse(format!("CSV header is missing the '{name}' column")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
instrument_key,segment,name,exchange
NSE_EQ|INE848E01016,NSE_EQ,NHPC LTD,NSE
NSE_EQ|INE0NLT01010,NSE_EQ,\"HVAX TECHNOLOGIES, LIMITED\",NSE
BSE_EQ|INE848E01016,BSE_EQ,NHPC LTD,BSE
NSE_EQ|BROKEN,NSE_EQ,,NSE

";

    #[test]
    fn parse_listing() {
        let dir = parse_directory_csv(LISTING).unwrap();
        assert_eq!(dir.len(), 3);

        let hvax = dir.get("NSE_EQ|INE0NLT01010").unwrap();
        assert_eq!(hvax.name, "HVAX TECHNOLOGIES, LIMITED");
        assert_eq!(hvax.segment, "NSE_EQ");
        assert!(dir.get("NSE_EQ|BROKEN").is_none());
        assert_eq!(dir.search("nhpc").len(), 2);
    }

    #[test]
    fn quoted_fields_with_escapes_and_newlines() {
        let csv = "segment,name,instrument_key\r\n\
NSE_EQ,\"SAY \"\"HI\"\" LTD\",NSE_EQ|INE000000001\r\n\
NSE_EQ,\"MULTI\nLINE LTD\",NSE_EQ|INE000000002\r\n";
        let dir = parse_directory_csv(csv).unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(
            dir.get("NSE_EQ|INE000000001").unwrap().name,
            "SAY \"HI\" LTD"
        );
        assert_eq!(
            dir.get("NSE_EQ|INE000000002").unwrap().name,
            "MULTI\nLINE LTD"
        );
    }

    #[test]
    fn short_rows_are_dropped() {
        let dir = parse_directory_csv("segment,name,instrument_key\nNSE_EQ,NHPC LTD\n").unwrap();
        assert!(dir.is_empty());
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = parse_directory_csv("segment,name\nNSE_EQ,NHPC LTD\n").unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
        assert!(err.to_string().contains("instrument_key"));

        assert!(matches!(
            parse_directory_csv(""),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn header_is_case_insensitive() {
        let csv = "\u{feff}Segment, Name ,INSTRUMENT_KEY\nNSE_EQ,NHPC LTD,NSE_EQ|INE848E01016\n";
        let dir = parse_directory_csv(csv).unwrap();
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get("NSE_EQ|INE848E01016").unwrap().name, "NHPC LTD");
    }

    #[tokio::test]
    async fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instruments.csv");
        std::fs::write(&path, LISTING).unwrap();

        let directory = load_directory(&path).await.unwrap();
        assert_eq!(directory.len(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_directory(&dir.path().join("absent.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Io(_)));
    }
}
