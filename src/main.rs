use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::terminal;
use log::{error, info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use circuit_tracks::audio;
use circuit_tracks::config::Args;
use circuit_tracks::loader::worker::Worker;
use circuit_tracks::logging;
use circuit_tracks::middle::Middle;
use circuit_tracks::midi::{listen_for_transport, MidiBridge, MidiEngine, MidirEngine, TransportSignal};
use circuit_tracks::pipeline::persistence;
use circuit_tracks::shared::InputEvent;
use circuit_tracks::tui;

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let log_path = match &args.log_file {
        Some(path) => path.clone(),
        None => logging::default_log_path()?,
    };
    logging::init_logger(&log_path, args.log_level)?;

    if args.list_midi {
        return list_midi_outputs();
    }

    let project_dir = args.project_dir();
    info!("project dir: {}", project_dir.display());

    let audio = audio::start_audio()?;
    let sample_rate = audio.sample_rate();
    let worker = Worker::spawn(sample_rate)?;

    let mut state = persistence::load_project(&project_dir).unwrap_or_default();
    state.bpm = args.bpm_or(state.bpm);
    let mut middle = Middle::new(state, sample_rate, &project_dir);
    middle.refresh_library();
    middle.restore_samples();

    // MIDI is optional; keep the input connections alive for the whole session
    let (signal_tx, signal_rx) = crossbeam_channel::unbounded::<TransportSignal>();
    let mut _midi_inputs = Vec::new();
    if args.no_midi {
        middle.midi_unavailable("disabled with --no-midi");
    } else {
        match MidirEngine::new() {
            Ok(engine) => {
                let mut bridge = MidiBridge::new(Box::new(engine));
                match &args.midi_output {
                    Some(name) => {
                        if let Err(e) = bridge.select(Some(name.as_str())) {
                            error!("could not open MIDI output '{}': {}", name, e);
                        }
                    }
                    None => {
                        bridge.auto_select();
                    }
                }
                middle.attach_midi(bridge);
                match listen_for_transport(signal_tx) {
                    Ok(inputs) => _midi_inputs = inputs,
                    Err(e) => warn!("MIDI input unavailable: {}", e),
                }
            }
            Err(e) => middle.midi_unavailable(&e.to_string()),
        }
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let mut last_tick = Instant::now();
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    'main: loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = middle.display_state();
        tui_state.sync(&ds);

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state, blink_on);
        })?;

        for event in tui::input::poll_input(tick_rate, &mut tui_state)? {
            if event == InputEvent::Quit {
                break 'main;
            }
            let refresh = matches!(event, InputEvent::LoadProject);
            for cmd in middle.handle_input(event) {
                audio.send(cmd);
            }
            if refresh {
                middle.refresh_library();
            }
        }

        while let Ok(signal) = signal_rx.try_recv() {
            middle.on_transport_signal(signal);
        }

        for job in middle.take_jobs() {
            worker.submit(job);
        }
        for result in worker.poll() {
            for cmd in middle.on_job_result(result) {
                audio.send(cmd);
            }
        }

        let elapsed = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        for cmd in middle.tick(elapsed) {
            audio.send(cmd);
        }
    }

    // save before quitting
    middle.shutdown();
    if let Err(e) = persistence::save_project(&project_dir, &middle.state) {
        error!("could not save project on quit: {:#}", e);
    }
    drop(term);
    drop(middle); // flushes any MIDI note still sounding
    drop(audio);
    info!("bye");
    Ok(())
}

fn list_midi_outputs() -> anyhow::Result<()> {
    let engine = MidirEngine::new()?;
    let outputs = engine.list_outputs();
    if outputs.is_empty() {
        println!("no MIDI outputs found");
    }
    for name in outputs {
        println!("{name}");
    }
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
