//! Thin driver: wire a descriptor together, run the pipeline, report.

use std::sync::Arc;

use authrisk::classifier::event::{
    COL_DETAILS, COL_HOST, COL_PROCESS, COL_RAW_LINE, COL_SOURCE_IP, COL_TIMESTAMP, COL_USER_ID,
};
use authrisk::scoring::ADJUSTED_RISK_SCORE_COL;
use authrisk::{
    DataFormat, DatasetDescriptor, Pipeline, PipelineOptions, ScoringConfig, TabularDataset,
    TaskPool,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "./data_in/SSH.log".to_string());
    let output = args.next().unwrap_or_else(|| "./SSH_Log_data.csv".to_string());
    let output_tag = args.next().unwrap_or_else(|| "csv".to_string());

    let output_format = match DataFormat::parse_tag("OpenSSH sample log", &output_tag) {
        Ok(format) => format,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    log::info!("authrisk starting: '{}' -> '{}' ({})", input, output, output_tag);

    let mandatory = [
        COL_TIMESTAMP,
        COL_HOST,
        COL_PROCESS,
        COL_USER_ID,
        COL_SOURCE_IP,
        COL_RAW_LINE,
        COL_DETAILS,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    let descriptor = DatasetDescriptor::new(
        "OpenSSH sample log",
        input,
        DataFormat::Log,
        output,
        output_format,
        mandatory,
    );

    let dataset = Arc::new(TabularDataset::new(descriptor));
    let pool = Arc::new(TaskPool::default());
    let pipeline = Pipeline::new(Arc::clone(&pool), ScoringConfig::default());

    if let Err(e) = pipeline.run(&dataset, PipelineOptions::default()) {
        log::error!("pipeline failed: {}", e);
        std::process::exit(1);
    }

    let summary = dataset.inspect(|table| {
        let risky = (0..table.row_count())
            .filter(|&i| table.get(i, ADJUSTED_RISK_SCORE_COL).as_i64().unwrap_or(0) >= 100)
            .count();
        (table.row_count(), risky)
    });
    if let Ok((rows, risky)) = summary {
        log::info!("done: {} event(s) scored, {} with adjusted risk >= 100", rows, risky);
    }
}
