use std::fs::File;

use smlpipe_decode::{MeasurementFilter, MessageDecoder, SmlDecoder};
use smlpipe_delivery::Shutdown;
use smlpipe_frame::{FrameError, FrameReader};
use smlpipe_transport::{ByteSource, SerialConfig, SerialPort, StreamSource};

use crate::cmd::{install_ctrlc_handler, DumpArgs};
use crate::exit::{
    frame_error, transport_error, CliError, CliResult, DATA_INVALID, ERR_CONFIG, ERR_DEVICE,
    SUCCESS, USAGE,
};
use crate::output::{hexdump, print_records, OutputFormat};

pub fn run(args: DumpArgs, verbose: u8) -> CliResult<i32> {
    let format = args.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let decoder = SmlDecoder::new().with_crc_check(!args.no_crc);
    let session = Session {
        decoder,
        filter: MeasurementFilter::default(),
        format,
        count: args.count,
        hex: verbose > 0,
    };

    if let Some(path) = args.replay {
        let file = File::open(&path).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                ERR_DEVICE,
                format!("opening capture {}: {err}", path.display()),
            )
        })?;
        return session.run(FrameReader::new(StreamSource::new(file)), None);
    }

    let Some(device) = args.device else {
        return Err(CliError::new(
            USAGE,
            ERR_CONFIG,
            "either --device or --replay is required",
        ));
    };
    let config = SerialConfig {
        baud: args.baud,
        ..SerialConfig::default()
    };
    let port = SerialPort::open(&device, config)
        .map_err(|err| transport_error("opening meter", err))?;

    let shutdown = Shutdown::new();
    install_ctrlc_handler(shutdown.clone())?;
    session.run(FrameReader::new(port.into_source()), Some(&shutdown))
}

struct Session<D> {
    decoder: D,
    filter: MeasurementFilter,
    format: OutputFormat,
    count: Option<usize>,
    hex: bool,
}

impl<D: MessageDecoder> Session<D> {
    /// Print frames until `count` is reached, Ctrl-C, or (without a
    /// shutdown signal, i.e. replaying a capture) the end of input.
    fn run<S: ByteSource>(
        &self,
        mut reader: FrameReader<S>,
        shutdown: Option<&Shutdown>,
    ) -> CliResult<i32> {
        let mut frames = 0usize;

        while !shutdown.is_some_and(Shutdown::is_triggered) {
            if self.count.is_some_and(|count| frames >= count) {
                break;
            }

            let frame = match reader.next_frame() {
                Ok(frame) => frame,
                Err(err @ FrameError::Transport(_)) => return Err(frame_error("reading meter", err)),
                Err(err @ FrameError::NoStart { .. }) if shutdown.is_none() => {
                    if frames == 0 {
                        return Err(frame_error("reading capture", err));
                    }
                    break;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping frame");
                    continue;
                }
            };

            if self.hex {
                eprint!("{}", hexdump(frame.as_bytes()));
            }
            match self.decoder.decode(&frame) {
                Ok(records) => print_records(frames, &records, &self.filter, self.format),
                Err(err) => tracing::warn!(frame = frames, error = %err, "undecodable frame"),
            }
            frames += 1;
        }

        tracing::debug!(frames, "dump finished");
        Ok(SUCCESS)
    }
}
