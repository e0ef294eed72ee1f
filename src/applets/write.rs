// Write applet: program an .omi file back into the radio
//
// An optional reference file (typically the capture the edits started
// from) turns this into a differential write: blocks identical to the
// reference are skipped.

use crate::formats::omi::OmiFile;
use crate::serial::{ByteLink, SerialLink, Session, BLOCK_SIZE, MAX_MODEL_LEN, PORT_TIMEOUT};
use crate::util::printable;
use anyhow::{bail, Context, Result};
use std::path::Path;

pub fn run(input: &Path, reference: Option<&Path>, port: &str) -> Result<()> {
    let omi = OmiFile::load(input).with_context(|| format!("loading {}", input.display()))?;
    let reference = match reference {
        Some(path) => {
            Some(OmiFile::load(path).with_context(|| format!("loading {}", path.display()))?)
        }
        None => None,
    };

    let link = SerialLink::open(port, PORT_TIMEOUT)?;
    program(link, &omi, reference.as_ref())
}

/// Validate the image pair and program every (changed) block.
pub fn program<L: ByteLink>(link: L, omi: &OmiFile, reference: Option<&OmiFile>) -> Result<()> {
    if omi.offset != 0 {
        bail!("input file offset not zero (not supported)");
    }
    if omi.data.len() % BLOCK_SIZE != 0 {
        bail!(
            "input file size {:#x} is not a multiple of the {:#x} byte block size",
            omi.data.len(),
            BLOCK_SIZE
        );
    }
    if omi.data.len() > u16::MAX as usize + 1 {
        bail!("input file too large for the radio address space");
    }

    if let Some(reference) = reference {
        if reference.offset != omi.offset
            || reference.model != omi.model
            || reference.data.len() != omi.data.len()
        {
            bail!("reference file does not match input file (offset, model or size differ)");
        }
        if reference.data == omi.data {
            bail!("data identical, wouldn't write anything");
        }
    }

    let mut session = Session::open(link).context("establishing programming session")?;
    tracing::info!("connected, radio model: {}", printable(session.model()));

    let file_model = &omi.model[..omi.model.len().min(MAX_MODEL_LEN)];
    if session.model() != file_model {
        let radio = printable(session.model());
        session.abort();
        bail!(
            "model mismatch (file {}, radio {})",
            printable(file_model),
            radio
        );
    }

    let mut written = 0usize;
    for offset in (0..omi.data.len()).step_by(BLOCK_SIZE) {
        let block = &omi.data[offset..offset + BLOCK_SIZE];
        if let Some(reference) = reference {
            if &reference.data[offset..offset + BLOCK_SIZE] == block {
                tracing::debug!("skipping unchanged block at {:#06x}", offset);
                continue;
            }
        }
        if let Err(e) = session.write_block(offset as u16, block) {
            session.abort();
            return Err(e).with_context(|| format!("writing block at {:#06x}", offset));
        }
        written += 1;
        tracing::debug!("wrote block at {:#06x}", offset);
    }

    // The radio already holds the new data at this point; a termination
    // failure must not look like a failed write.
    session
        .finish()
        .context("terminating session (data was written)")?;
    tracing::info!("programmed {} blocks", written);
    Ok(())
}
