use smlpipe::Producer;
use smlpipe_decode::SmlDecoder;
use smlpipe_delivery::{
    spawn, DeliveryQueue, GraphiteSink, InfluxSink, Shutdown, Sink, SinkId, SinkWorker,
    WorkerConfig,
};
use smlpipe_frame::FrameReader;
use smlpipe_transport::SerialPort;
use std::thread::JoinHandle;

use crate::cmd::{install_ctrlc_handler, RunArgs};
use crate::config::AppConfig;
use crate::exit::{config_error, delivery_error, transport_error, CliError, CliResult, SUCCESS};

pub fn run(args: RunArgs, verbose: u8) -> CliResult<i32> {
    let mut config = AppConfig::from_file(&args.config).map_err(config_error)?;
    if let Some(device) = args.device {
        config.device = device;
    }

    // Sink clients are built before the device is touched so that a bad
    // sink setting is reported as a config error.
    let influx = config
        .influx()
        .map(|c| InfluxSink::new(c.clone()))
        .transpose()
        .map_err(|err| delivery_error("influx sink", err))?;
    let graphite = config.graphite().map(|c| GraphiteSink::new(c.clone()));

    let port = SerialPort::open(&config.device, config.serial())
        .map_err(|err| transport_error("opening meter", err))?;

    let shutdown = Shutdown::new();
    install_ctrlc_handler(shutdown.clone())?;

    let mut queues = DeliveryQueue::new();
    let mut workers = Vec::new();
    let started = start_workers(
        influx,
        graphite,
        &mut queues,
        config.worker(),
        &shutdown,
        &mut workers,
    );
    if let Err(err) = started {
        shutdown.trigger();
        join_all(workers)?;
        return Err(err);
    }

    let sinks: Vec<&str> = queues.sinks().map(SinkId::as_str).collect();
    tracing::info!(
        device = %config.device.display(),
        ?sinks,
        verify_crc = config.verify_crc,
        "smlpipe running"
    );

    let decoder = SmlDecoder::new().with_crc_check(config.verify_crc);
    let mut producer = Producer::new(
        FrameReader::new(port.into_source()),
        decoder,
        config.filter(),
        queues,
    )
    .with_frame_dump(verbose > 0);
    producer.run(&shutdown);

    join_all(workers)?;
    Ok(SUCCESS)
}

fn start_workers(
    influx: Option<InfluxSink>,
    graphite: Option<GraphiteSink>,
    queues: &mut DeliveryQueue,
    config: WorkerConfig,
    shutdown: &Shutdown,
    workers: &mut Vec<JoinHandle<()>>,
) -> CliResult<()> {
    if let Some(sink) = influx {
        workers.push(start_worker(sink, queues, config, shutdown)?);
    }
    if let Some(sink) = graphite {
        workers.push(start_worker(sink, queues, config, shutdown)?);
    }
    Ok(())
}

fn start_worker<S: Sink + 'static>(
    sink: S,
    queues: &mut DeliveryQueue,
    config: WorkerConfig,
    shutdown: &Shutdown,
) -> CliResult<JoinHandle<()>> {
    let queue = queues.register(SinkId::new(sink.name()));
    spawn(SinkWorker::new(sink, queue, config), shutdown.clone())
        .map_err(|err| CliError::internal(err.to_string()))
}

fn join_all(workers: Vec<JoinHandle<()>>) -> CliResult<()> {
    for worker in workers {
        worker
            .join()
            .map_err(|_| CliError::internal("sink worker panicked"))?;
    }
    Ok(())
}
