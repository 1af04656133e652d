mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{ChannelEdit, Cli};
use stemotion::audio::analysis::AnalysisConfig;
use stemotion::audio::batch::{AnalysisBatch, SourceInput};
use stemotion::audio::decode::decode_audio;
use stemotion::channels::session::Session;
use stemotion::config::{find_config_path, load_config, Config};
use stemotion::export::payload::ExportPayload;
use stemotion::refine::queue::RefineQueue;
use stemotion::templates::loader;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let config = match find_config_path(cli.config.clone()) {
        Some(path) => {
            let cfg = load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    // Config values apply only when the CLI is at its default
    if cli.fps == 30.0 { cli.fps = config.analysis.fps; }
    if cli.bpm == 120.0 { cli.bpm = config.analysis.bpm; }
    if cli.time_signature == 4 { cli.time_signature = config.analysis.time_signature; }
    if cli.script.is_none() { cli.script = config.export.script.clone(); }

    if cli.list_templates {
        println!("Available templates:");
        for name in loader::list_templates()? {
            match loader::load_template(&name) {
                Ok(t) => println!("  {:<16} {}", t.manifest.display_name, t.manifest.description),
                Err(_) => println!("  {}", name),
            }
        }
        return Ok(());
    }

    let input = cli.input.as_ref().context("Master audio file is required")?;
    let mut inputs = vec![SourceInput::from_path(input.clone())];
    inputs.extend(cli.stems.iter().cloned().map(SourceInput::from_path));
    for i in &inputs {
        if !i.path.exists() {
            anyhow::bail!("Input file not found: {}", i.path.display());
        }
    }

    let analysis = AnalysisConfig {
        fps: cli.fps,
        bpm: cli.bpm,
        time_signature: cli.time_signature,
    };
    analysis.validate()?;

    log::info!("stemotion - audio to motion channels");
    log::info!("Master: {}", input.display());
    log::info!("Stems: {}", cli.stems.len());
    log::info!(
        "Analysis: {} fps, {} bpm, {} beats per bar",
        analysis.fps,
        analysis.bpm,
        analysis.time_signature
    );

    // 1. Decode and extract every source on a worker thread
    let batch = AnalysisBatch::spawn(inputs, analysis, |i| decode_audio(&i.path))?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}% {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    for progress in batch.progress().iter() {
        pb.set_position(progress.percent.round() as u64);
        pb.set_message(format!("{} ({}/{})", progress.source, progress.completed, progress.total));
    }
    let output = batch.wait().context("Analysis failed; nothing was imported")?;
    pb.finish_with_message("Analysis complete");

    for source in output.registry.iter() {
        log::info!(
            "Source '{}' ({:?}): {} channel(s), {}Hz, {:.1}s",
            source.id,
            source.role,
            source.channels.len(),
            source.sample_rate,
            source.duration
        );
    }

    // 2. Channel state with default settings, then config and CLI edits
    let mut session = Session::new(analysis, output.channels)?;
    let mut queue = RefineQueue::new();

    for (id, channel) in &config.channels {
        let Some(state) = session.channel(id) else {
            log::warn!("Config refers to unknown channel '{}', skipping", id);
            continue;
        };
        let flags = channel.flags(state.flags);
        session.set_flags(id, flags)?;
        queue.submit(id, channel.settings);
    }

    for arg in &cli.edits {
        let edit = ChannelEdit::parse(arg)?;
        if edit.is_flag() {
            let value = edit.flag_value()?;
            match edit.field.as_str() {
                "visible" => session.set_visible(&edit.channel, value)?,
                "mute" => session.set_mute(&edit.channel, value)?,
                _ => session.set_solo(&edit.channel, value)?,
            }
            continue;
        }
        let mut settings = match queue.pending(&edit.channel) {
            Some(pending) => *pending,
            None => *session
                .channel(&edit.channel)
                .with_context(|| format!("Unknown channel '{}'", edit.channel))?
                .settings(),
        };
        settings
            .set_field(&edit.field, &edit.value)
            .with_context(|| format!("Invalid edit '{}'", arg))?;
        queue.submit(&edit.channel, settings);
    }

    let edited = session.apply_queue(&mut queue)?;
    log::info!("Refined {} edited channels ({} edits coalesced)", edited, queue.superseded());

    if cli.list_channels {
        print_channels(&session);
    }

    // 3. Export
    let payload = ExportPayload::from_session(&session, &config.export.generator);
    payload.write(&cli.output)?;

    if let Some(ref name) = cli.script {
        let template = loader::load_template(name)?;
        let params = cli::parse_params(&cli.params);
        let script = loader::render(&template, &payload, &params)?;
        let path = cli
            .script_output
            .clone()
            .unwrap_or_else(|| cli.output.with_extension(&template.manifest.extension));
        std::fs::write(&path, script)
            .with_context(|| format!("Failed to write script: {}", path.display()))?;
        log::info!("Wrote {} script to {}", template.manifest.display_name, path.display());
    }

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

fn print_channels(session: &Session) {
    println!(
        "{:<28} {:<10} {:>7} {:>5} {:>5} {:>5}  {}",
        "ID", "CATEGORY", "VISIBLE", "EYE", "MUTE", "SOLO", "NAME"
    );
    for ((state, raw), shown) in session
        .channels()
        .iter()
        .zip(session.raw_channels())
        .zip(session.visibility())
    {
        println!(
            "{:<28} {:<10} {:>7} {:>5} {:>5} {:>5}  {}",
            state.id,
            raw.category.as_str(),
            if shown { "yes" } else { "-" },
            state.flags.visible,
            state.flags.mute,
            state.flags.solo,
            raw.display_name
        );
    }
}
