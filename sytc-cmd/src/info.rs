use std::io::{stdout, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use sytc::{ByteSource, FrameDecoder, Summary};
use tracing::debug;

use crate::render::{mode_label, render_text, Format};

#[derive(Debug, Clone, Serialize)]
struct Mode {
    mode: u8,
    label: String,
    frames: usize,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    summary: Summary,
    modes: Vec<Mode>,
}

fn summarize<S: ByteSource>(filename: &str, source: S, decoder: FrameDecoder) -> Info {
    let mut summary = Summary::default();
    for zult in decoder.frames(source) {
        if let Err(err) = &zult {
            debug!("failed to decode frame: {err}");
        }
        summary.add(&zult);
    }

    let modes = summary
        .modes
        .iter()
        .map(|(mode, frames)| Mode {
            mode: *mode,
            label: mode_label(u64::from(*mode)),
            frames: *frames,
        })
        .collect();

    Info {
        filename: filename.to_string(),
        summary,
        modes,
    }
}

pub fn info<S: ByteSource>(
    filename: &str,
    source: S,
    decoder: FrameDecoder,
    format: &Format,
) -> Result<()> {
    let info = summarize(filename, source, decoder);

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(TEXT_TEMPLATE, &info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Frames:           {{ summary.frames }}
Targets:          {{ summary.targets }}
Bad terminators:  {{ summary.checksum_invalid }}
First time:       {{ summary.first_time }} mins
Last time:        {{ summary.last_time }} mins
-------------------------------------------------------------------------------
Failures          Timeout  Truncated  Malformed  Checksum       IO
                  {{ lpad 7 summary.failures.timeout }}  {{ lpad 9 summary.failures.truncated }}  {{ lpad 9 summary.failures.malformed }}  {{ lpad 8 summary.failures.checksum_mismatch }}  {{ lpad 7 summary.failures.io }}
-------------------------------------------------------------------------------
Mode  Label                         Frames
-------------------------------------------------------------------------------
{{ #each modes }}{{ lpad 4 mode }}  {{ label }}{{ lpad 30 frames }}
{{ /each }}";

#[cfg(test)]
mod tests {
    use super::*;
    use sytc::{Frame, ReaderSource};

    #[test]
    fn summarize_capture() {
        let mut dat = Frame::new(2, 1, 1, vec![], [0, 0]).encode();
        dat.extend([0xff; 7]);
        dat.extend(Frame::new(2, 2, 1, vec![], [0, 0]).encode());
        let mut bad = Frame::new(1, 3, 1, vec![], [0, 0]).encode();
        bad[9] = 0; // work_status
        dat.extend(bad);

        let info = summarize("capture.dat", ReaderSource::new(&dat[..]), FrameDecoder::default());

        assert_eq!(info.summary.frames, 2);
        assert_eq!(info.summary.failures.malformed, 1);
        assert_eq!(info.modes.len(), 1);
        assert_eq!(info.modes[0].label, "Back Detection");
        assert_eq!(info.modes[0].frames, 2);

        let text = render_text(TEXT_TEMPLATE, &info).unwrap();
        assert!(text.starts_with("capture.dat\n"), "{text}");
        assert!(text.contains("Frames:           2\n"), "{text}");
    }
}
