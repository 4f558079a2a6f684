use std::io::{stdout, Write};

use anyhow::{Context, Result};
use sytc::{ByteSource, Error, FrameDecoder};
use tracing::{debug, info, warn};

use crate::render::{Format, TextRenderer};

pub fn decode<S: ByteSource>(source: S, decoder: FrameDecoder, format: &Format) -> Result<()> {
    let mut out = stdout().lock();
    let count = decode_to(source, decoder, format, &mut out)?;
    info!("decoded {count} frames");
    Ok(())
}

/// Write every frame decoded from `source` to `out`, returning the number of frames.
pub fn decode_to<S, W>(source: S, decoder: FrameDecoder, format: &Format, out: &mut W) -> Result<usize>
where
    S: ByteSource,
    W: Write,
{
    let renderer = match format {
        Format::Text => Some(TextRenderer::new(TEXT_TEMPLATE)?),
        Format::Json => None,
    };
    let mut count = 0;
    for (idx, zult) in decoder.frames(source).enumerate() {
        let frame = match zult {
            Ok(frame) => frame,
            Err(Error::Timeout) => {
                debug!(attempt = idx, "no frame before timeout");
                continue;
            }
            Err(err @ Error::Io(_)) => return Err(err).context("reading input"),
            Err(err) => {
                warn!(attempt = idx, "dropping frame: {err}");
                continue;
            }
        };
        if frame.checksum_invalid {
            warn!(
                attempt = idx,
                terminator = ?frame.footer.terminator,
                "frame has a bad terminator"
            );
        }

        match &renderer {
            Some(renderer) => {
                let data = renderer.render(&frame).context("serializing frame")?;
                out.write_all(data.as_bytes()).context("writing output")?;
            }
            None => {
                serde_json::to_writer(&mut *out, &frame).context("serializing to json")?;
                out.write_all(b"\n").context("writing output")?;
            }
        }
        count += 1;
    }
    Ok(count)
}

const TEXT_TEMPLATE: &str = r"Mode: {{ mode header.mode }}, Time: {{ header.time }} mins, Targets: {{ header.num_targets }}, Status: {{ work_status header.work_status }}, Data Length: {{ header.data_length }} bytes, Reserve: {{ hex header.reserve }}
{{ #each bodies }}  [{{ tlv_signal }}] distance={{ lpad 3 target_distance }} azimuth={{ lpad 4 target_azimuth }} status={{ target_status current_status }} respiration={{ lpad 3 respiration_value }} heart_rate={{ lpad 3 heart_rate_value }}
      respiration_curve: {{ hex respiration_curve }}
      heart_rate_curve:  {{ hex heart_rate_curve }}
{{ /each }}  checksum={{ hex footer.checksum }} terminator={{ hex footer.terminator }}{{ #if checksum_invalid }} (invalid){{ /if }}
";
