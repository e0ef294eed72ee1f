// Import applet: apply an edited table onto an .omi image
//
// The table is applied row by row; the first invalid row aborts the whole
// import and the output file is never touched.

use super::log_warnings;
use crate::codec::channel::Channel;
use crate::codec::image::{ImageKind, NUM_CHANNELS};
use crate::codec::keys::{encode_key, FUNC_KEY_NAMES, MIC_KEY_NAMES};
use crate::codec::{CodecError, Image, Warnings};
use crate::formats::omi::OmiFile;
use crate::formats::table::{self, tags, Row, TableFormat};
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

pub fn run(input: &Path, table_path: &Path, format: TableFormat, output: &Path) -> Result<()> {
    let omi = OmiFile::load(input).with_context(|| format!("loading {}", input.display()))?;
    let image = Image::from_payload(omi.offset, omi.data)?;
    if image.kind() != ImageKind::Full {
        bail!("input file does not contain a full memory image");
    }

    let rows = table::read_rows(table_path, format)
        .with_context(|| format!("reading {}", table_path.display()))?;

    let mut warnings = Warnings::new();
    let image = apply_rows(image, &rows, &mut warnings)?;
    log_warnings(&warnings);

    OmiFile::new(0, omi.model, image.into_data())
        .save(output)
        .with_context(|| format!("saving {}", output.display()))?;
    tracing::info!("imported {} rows into {}", rows.len(), output.display());
    Ok(())
}

/// Apply every row in order. Blank and comment rows are skipped; any
/// other failure carries its 1-based line number.
pub fn apply_rows(mut image: Image, rows: &[Row], warnings: &mut Warnings) -> Result<Image> {
    for (index, row) in rows.iter().enumerate() {
        let line = index + 1;
        let tag = match row.first() {
            None => continue,
            Some(tag) if tag.is_empty() => continue,
            Some(tag) => tag.as_str(),
        };

        let result = match tag {
            tags::COMMENT => Ok(()),
            tags::WELCOME => import_welcome(&mut image, row),
            tags::CHANNEL => import_channel(&mut image, row),
            tags::KEY => import_key(&mut image, row, warnings),
            tags::SETTING => import_setting(&mut image, row),
            other => Err(anyhow!("command '{}' not recognized", other)),
        };
        result.with_context(|| format!("line {}", line))?;
    }
    Ok(image)
}

fn import_welcome(image: &mut Image, row: &Row) -> Result<()> {
    let text = row.get(1).map(String::as_str).unwrap_or("");
    image.set_welcome(text)?;
    tracing::debug!("imported welcome message: {}", text);
    Ok(())
}

fn import_channel(image: &mut Image, row: &Row) -> Result<()> {
    let raw = row
        .get(1)
        .ok_or_else(|| anyhow!("invalid channel format in input file (too short)"))?;
    let number = raw
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=NUM_CHANNELS).contains(n))
        .ok_or_else(|| CodecError::BadChannelNumber(raw.clone()))?;

    if row.len() == 2 || row[2].is_empty() {
        tracing::debug!("removing channel {}", number);
        image.remove_channel(number);
        return Ok(());
    }

    let channel = Channel::from_fields(number, &row[2..])
        .with_context(|| format!("channel {}", number))?;
    channel
        .apply(image.slot_mut(number))
        .with_context(|| format!("channel {}", number))?;
    image.set_channel_enabled(number, true);
    image.set_scan_enabled(number, channel.scan);

    tracing::debug!("imported channel {}", number);
    Ok(())
}

fn import_key(image: &mut Image, row: &Row, warnings: &mut Warnings) -> Result<()> {
    if row.len() < 3 {
        bail!("invalid key format in input file (too short)");
    }
    let name = row[1].as_str();

    if let Some(index) = FUNC_KEY_NAMES.iter().position(|&n| n == name) {
        let value = encode_key(&row[2], false, warnings)?;
        image.set_func_key(index, value);
        return Ok(());
    }
    if let Some(index) = MIC_KEY_NAMES.iter().position(|&n| n == name) {
        let value = encode_key(&row[2], true, warnings)?;
        image.set_mic_key(index, value);
        return Ok(());
    }

    Err(CodecError::BadKeyName(name.to_string()).into())
}

fn import_setting(image: &mut Image, row: &Row) -> Result<()> {
    if row.len() < 3 {
        bail!("invalid setting format in input file (too short)");
    }
    let value = match row[2].as_str() {
        "yes" => true,
        "no" => false,
        other => bail!("invalid setting value ({})", other),
    };
    image.set_setting(&row[1], value)?;
    Ok(())
}
