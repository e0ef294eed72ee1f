// Export applet: render an .omi image as an editable table

use super::log_warnings;
use crate::codec::image::{ImageKind, NUM_CHANNELS, SETTINGS};
use crate::codec::keys::{decode_key, FUNC_KEY_NAMES, MIC_KEY_NAMES};
use crate::codec::{Image, Warnings};
use crate::formats::omi::OmiFile;
use crate::formats::table::{self, tags, Row, TableFormat};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run(input: &Path, output: &Path, format: TableFormat) -> Result<()> {
    let omi = OmiFile::load(input).with_context(|| format!("loading {}", input.display()))?;
    let image = Image::from_payload(omi.offset, omi.data)?;

    let mut warnings = Warnings::new();
    let rows = build_rows(&image, &mut warnings);
    log_warnings(&warnings);

    table::write_rows(output, format, &rows)
        .with_context(|| format!("writing {}", output.display()))?;
    tracing::info!("exported {} rows to {}", rows.len(), output.display());
    Ok(())
}

pub fn build_rows(image: &Image, warnings: &mut Warnings) -> Vec<Row> {
    let full = image.kind() == ImageKind::Full;
    let mut rows = Vec::new();

    if full {
        rows.push(vec![
            tags::WELCOME.to_string(),
            image.welcome(warnings),
        ]);
        rows.push(Vec::new());
    }

    rows.push(header_row());
    for number in 1..=NUM_CHANNELS {
        let mut row = vec![tags::CHANNEL.to_string(), number.to_string()];
        if let Some(channel) = image.channel(number, warnings) {
            row.extend(channel.to_fields());
        }
        rows.push(row);
    }

    if full {
        rows.push(Vec::new());
        rows.push(vec![
            tags::COMMENT.to_string(),
            "key assignments".to_string(),
        ]);
        for (index, name) in FUNC_KEY_NAMES.iter().enumerate() {
            rows.push(key_row(name, image.func_key(index), false, warnings));
        }
        for (index, name) in MIC_KEY_NAMES.iter().enumerate() {
            rows.push(key_row(name, image.mic_key(index), true, warnings));
        }

        rows.push(Vec::new());
        rows.push(vec![tags::COMMENT.to_string(), "settings".to_string()]);
        for (name, _) in SETTINGS {
            let value = image.setting(name).unwrap_or(false);
            rows.push(vec![
                tags::SETTING.to_string(),
                name.to_string(),
                (if value { "yes" } else { "no" }).to_string(),
            ]);
        }
    }

    rows
}

fn header_row() -> Row {
    [
        tags::COMMENT,
        "number",
        "name",
        "frequency",
        "rx decoder",
        "tx encoder",
        "squelch",
        "tx power",
        "bandwidth",
        "bcl",
        "ptt id",
        "opt signaling",
        "scanning",
        "talkaround",
        "reverse",
        "def ctcss",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn key_row(name: &str, value: u8, is_mic: bool, warnings: &mut Warnings) -> Row {
    vec![
        tags::KEY.to_string(),
        name.to_string(),
        decode_key(value, name, is_mic, warnings),
    ]
}
