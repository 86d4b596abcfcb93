use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use shelfwatch_core::{CaptureTimestamps, ExtractionResult};

use crate::DeliveryError;

/// Column order of the batch CSV. Downstream loaders key on position, so
/// this order is part of the delivery contract.
const CSV_HEADERS: [&str; 22] = [
    "SITE",
    "CHANNEL",
    "CAPTURED_LOCAL",
    "CAPTURED_REF",
    "RETAILER_ID",
    "SKU",
    "BRAND",
    "ITEM",
    "FORM_FACTOR",
    "SEGMENT_LV1",
    "SEGMENT_LV2",
    "SEGMENT_LV3",
    "CAPACITY",
    "URL",
    "TITLE",
    "PRICE",
    "VAT_INCLUDED",
    "SOLD_BY",
    "SHIPS_FROM",
    "IMAGE_URL",
    "AVAILABILITY",
    "STATUS",
];

/// Every row is an online capture; the column exists for loaders that also
/// ingest in-store feeds.
const CHANNEL: &str = "online";

/// The staged artifacts for one batch. The staging directory holding all
/// three files is removed when this value drops, delivered or not.
#[derive(Debug)]
pub struct PackagedBatch {
    pub base_name: String,
    pub csv_name: String,
    pub zip_name: String,
    pub manifest_name: String,
    pub csv_path: PathBuf,
    pub zip_path: PathBuf,
    pub manifest_path: PathBuf,
    _staging: TempDir,
}

/// Stage one batch for delivery: a CSV of the result rows, a single-entry
/// deflated zip of that CSV, and an MD5 manifest naming the zip and the CSV
/// with their digests, zip line first.
///
/// All three artifacts share the `{YYYYMMDD}_{HHMMSS}_{site}` stem, with
/// both tokens rendered in the site's own zone.
///
/// # Errors
///
/// Returns an error when the staging directory cannot be created or any of
/// the three artifacts fails to serialize.
pub fn package_batch(
    results: &[ExtractionResult],
    site: &str,
    stamp: &CaptureTimestamps,
) -> Result<PackagedBatch, DeliveryError> {
    let staging = TempDir::new()?;
    let base_name = format!("{}_{}_{}", stamp.local_date(), stamp.local_time(), site);
    let csv_name = format!("{base_name}.csv");
    let zip_name = format!("{base_name}.zip");
    let manifest_name = format!("{base_name}.md5");
    let csv_path = staging.path().join(&csv_name);
    let zip_path = staging.path().join(&zip_name);
    let manifest_path = staging.path().join(&manifest_name);

    write_csv(&csv_path, results)?;
    write_zip(&zip_path, &csv_path, &csv_name)?;
    write_manifest(&manifest_path, &zip_path, &zip_name, &csv_path, &csv_name)?;

    tracing::info!(base = %base_name, rows = results.len(), "batch staged");
    Ok(PackagedBatch {
        base_name,
        csv_name,
        zip_name,
        manifest_name,
        csv_path,
        zip_path,
        manifest_path,
        _staging: staging,
    })
}

fn write_csv(path: &Path, results: &[ExtractionResult]) -> Result<(), DeliveryError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_path(path)?;
    writer.write_record(CSV_HEADERS)?;
    for result in results {
        writer.write_record(record(result))?;
    }
    writer.flush()?;
    Ok(())
}

/// One CSV row in [`CSV_HEADERS`] order. Absent fields serialize as empty
/// cells, never as a sentinel string.
fn record(result: &ExtractionResult) -> [String; 22] {
    let meta = &result.target.meta;
    let fields = &result.fields;
    [
        result.target.site.clone(),
        CHANNEL.to_string(),
        result.captured.local.clone(),
        result.captured.reference.clone(),
        meta.retailer_id.clone().unwrap_or_default(),
        meta.sku.clone().unwrap_or_default(),
        meta.brand.clone().unwrap_or_default(),
        meta.item.clone().unwrap_or_default(),
        meta.form_factor.clone().unwrap_or_default(),
        meta.segment_lv1.clone().unwrap_or_default(),
        meta.segment_lv2.clone().unwrap_or_default(),
        meta.segment_lv3.clone().unwrap_or_default(),
        meta.capacity.clone().unwrap_or_default(),
        result.target.url.clone(),
        fields.title.clone().unwrap_or_default(),
        fields.price.clone().unwrap_or_default(),
        result.vat_included.to_string(),
        fields.sold_by.clone().unwrap_or_default(),
        fields.ships_from.clone().unwrap_or_default(),
        fields.image_url.clone().unwrap_or_default(),
        fields.availability.clone().unwrap_or_default(),
        result.status.as_str().to_string(),
    ]
}

fn write_zip(zip_path: &Path, csv_path: &Path, entry_name: &str) -> Result<(), DeliveryError> {
    let file = File::create(zip_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(entry_name, options)?;
    let mut source = File::open(csv_path)?;
    std::io::copy(&mut source, &mut writer)?;
    writer.finish()?;
    Ok(())
}

fn write_manifest(
    manifest_path: &Path,
    zip_path: &Path,
    zip_name: &str,
    csv_path: &Path,
    csv_name: &str,
) -> Result<(), DeliveryError> {
    let zip_digest = md5::compute(std::fs::read(zip_path)?);
    let csv_digest = md5::compute(std::fs::read(csv_path)?);
    let mut manifest = File::create(manifest_path)?;
    writeln!(manifest, "{zip_name} {zip_digest:x}")?;
    writeln!(manifest, "{csv_name} {csv_digest:x}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use chrono::{DateTime, Utc};
    use shelfwatch_core::{ExtractedFields, ExtractionTarget, TargetMeta};

    use super::*;

    fn stamp() -> CaptureTimestamps {
        CaptureTimestamps::at(
            DateTime::parse_from_rfc3339("2024-03-01T12:30:05Z")
                .unwrap()
                .with_timezone(&Utc),
            chrono_tz::Europe::Berlin,
            chrono_tz::Asia::Seoul,
        )
    }

    fn target(id: i64) -> ExtractionTarget {
        ExtractionTarget {
            id,
            site: "de".to_string(),
            url: format!("https://www.amazon.de/dp/B{id:09}"),
            locale: "de".to_string(),
            meta: TargetMeta {
                retailer_id: Some("amazon_de".to_string()),
                sku: Some(format!("B{id:09}")),
                brand: Some("Acme".to_string()),
                item: Some("Widget Pro".to_string()),
                ..TargetMeta::default()
            },
        }
    }

    fn completed(id: i64, price: &str) -> ExtractionResult {
        let fields = ExtractedFields {
            title: Some("Acme Widget Pro".to_string()),
            price: Some(price.to_string()),
            sold_by: Some("Acme GmbH".to_string()),
            ships_from: Some("Amazon".to_string()),
            image_url: Some("https://img.example.com/widget.jpg".to_string()),
            availability: Some("Auf Lager".to_string()),
        };
        ExtractionResult::completed(target(id), fields, true, stamp())
    }

    #[test]
    fn artifact_names_share_the_local_stamp() {
        // 12:30:05 UTC is 13:30:05 in Berlin (CET).
        let batch = package_batch(&[completed(1, "1299.99")], "de", &stamp()).unwrap();
        assert_eq!(batch.base_name, "20240301_133005_de");
        assert_eq!(batch.csv_name, "20240301_133005_de.csv");
        assert_eq!(batch.zip_name, "20240301_133005_de.zip");
        assert_eq!(batch.manifest_name, "20240301_133005_de.md5");
        assert!(batch.csv_path.is_file());
        assert!(batch.zip_path.is_file());
        assert!(batch.manifest_path.is_file());
    }

    #[test]
    fn csv_rows_follow_the_header_contract() {
        let batch =
            package_batch(&[completed(1, "1299.99"), completed(2, "9.90")], "de", &stamp())
                .unwrap();

        let raw = std::fs::read_to_string(&batch.csv_path).unwrap();
        assert!(raw.ends_with("\r\n"), "rows must terminate with CRLF");
        assert_eq!(raw.matches("\r\n").count(), 3, "header plus two rows");

        let mut reader = csv::Reader::from_path(&batch.csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 22);
        assert_eq!(&headers[0], "SITE");
        assert_eq!(&headers[1], "CHANNEL");
        assert_eq!(&headers[15], "PRICE");
        assert_eq!(&headers[21], "STATUS");

        let rows: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "de");
        assert_eq!(&rows[0][1], "online");
        assert_eq!(&rows[0][2], "2024-03-01 13:30:05");
        assert_eq!(&rows[0][3], "2024-03-01 21:30:05");
        assert_eq!(&rows[0][5], "B000000001");
        assert_eq!(&rows[0][15], "1299.99");
        assert_eq!(&rows[0][16], "true");
        assert_eq!(&rows[0][21], "complete");
        assert_eq!(&rows[1][15], "9.90");
    }

    #[test]
    fn aborted_rows_keep_identity_and_empty_cells() {
        let aborted = ExtractionResult::aborted(target(3), true, stamp());
        let batch = package_batch(&[aborted], "de", &stamp()).unwrap();

        let mut reader = csv::Reader::from_path(&batch.csv_path).unwrap();
        let rows: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][13], "https://www.amazon.de/dp/B000000003");
        for extracted in 14..21 {
            if extracted == 16 {
                continue; // VAT_INCLUDED is a flag, not an extracted field
            }
            assert_eq!(&rows[0][extracted], "", "column {extracted} must be empty");
        }
        assert_eq!(&rows[0][21], "aborted");
    }

    #[test]
    fn manifest_lists_zip_then_csv_with_matching_digests() {
        let batch = package_batch(&[completed(1, "49.00")], "de", &stamp()).unwrap();

        let manifest = std::fs::read_to_string(&batch.manifest_path).unwrap();
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 2);

        let zip_digest = md5::compute(std::fs::read(&batch.zip_path).unwrap());
        let csv_digest = md5::compute(std::fs::read(&batch.csv_path).unwrap());
        assert_eq!(lines[0], format!("{} {:x}", batch.zip_name, zip_digest));
        assert_eq!(lines[1], format!("{} {:x}", batch.csv_name, csv_digest));
    }

    #[test]
    fn zip_holds_exactly_the_csv() {
        let batch = package_batch(&[completed(1, "49.00")], "de", &stamp()).unwrap();
        let csv_bytes = std::fs::read(&batch.csv_path).unwrap();

        let reader = std::io::Cursor::new(std::fs::read(&batch.zip_path).unwrap());
        let mut archive = zip::ZipArchive::new(reader).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), batch.csv_name);
        let mut unpacked = Vec::new();
        entry.read_to_end(&mut unpacked).unwrap();
        assert_eq!(unpacked, csv_bytes);
    }

    #[test]
    fn staging_directory_vanishes_on_drop() {
        let batch = package_batch(&[completed(1, "49.00")], "de", &stamp()).unwrap();
        let staging_dir = batch.csv_path.parent().unwrap().to_path_buf();
        assert!(staging_dir.is_dir());
        drop(batch);
        assert!(!staging_dir.exists());
    }

    #[test]
    fn empty_batch_packages_a_header_only_csv() {
        let batch = package_batch(&[], "de", &stamp()).unwrap();
        let raw = std::fs::read_to_string(&batch.csv_path).unwrap();
        assert_eq!(raw.matches("\r\n").count(), 1, "header line only");
        let manifest = std::fs::read_to_string(&batch.manifest_path).unwrap();
        assert_eq!(manifest.lines().count(), 2);
    }
}
