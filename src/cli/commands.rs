//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cli::wav::{read_wav, write_wav};
use crate::config::EngineConfig;
use crate::controller::MixController;
use crate::dsp::AudioBuffer;
use crate::error::{KeroError, Result};
use crate::params::{ParamGroup, ParamId, ParameterStore, PARAM_SPECS};
use crate::preset::PresetLibrary;
use crate::processor::KeroMixProcessor;
use crate::suggest::QUICK_COMMANDS;

/// Frames per block when rendering files
pub const RENDER_BLOCK: usize = 512;

/// Parse an `id=value` override
pub fn parse_assignment(text: &str) -> Result<(ParamId, f32)> {
    let invalid = || KeroError::InvalidState {
        reason: format!("Expected ID=VALUE, got '{}'", text),
    };
    let (id, value) = text.split_once('=').ok_or_else(invalid)?;
    let id = ParamId::from_str(id.trim()).ok_or_else(|| KeroError::InvalidState {
        reason: format!("Unknown parameter '{}'", id.trim()),
    })?;
    let value: f32 = value.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok((id, value))
}

fn apply_assignments(store: &ParameterStore, assignments: &[String]) -> Result<()> {
    for text in assignments {
        let (id, value) = parse_assignment(text)?;
        let stored = store.set(id, value);
        info!("{} = {}", id.as_str(), stored);
    }
    Ok(())
}

/// Run `buffer` through `processor` in host-sized blocks
pub fn render(processor: &mut KeroMixProcessor, buffer: &mut AudioBuffer) -> Result<()> {
    let channels = buffer.num_channels();
    let sample_rate = buffer.sample_rate();
    processor.prepare(sample_rate, RENDER_BLOCK)?;

    for chunk in buffer.samples_mut().chunks_mut(RENDER_BLOCK * channels) {
        let mut block = AudioBuffer::from_interleaved(chunk.to_vec(), channels, sample_rate)?;
        processor.process_block(&mut block);
        chunk.copy_from_slice(block.samples());
    }
    Ok(())
}

/// Print the parameter schema.
pub fn print_params() -> Result<()> {
    println!("{:<14} {:<14} {:>9} {:>9} {:>9}  GROUP", "ID", "LABEL", "MIN", "MAX", "DEFAULT");
    for spec in PARAM_SPECS.iter() {
        println!(
            "{:<14} {:<14} {:>9} {:>9} {:>9}  {}",
            spec.id,
            spec.label,
            spec.min,
            spec.max,
            spec.default,
            spec.group.name()
        );
    }
    Ok(())
}

/// Process a WAV file through the chain.
pub fn process_file(
    config: &EngineConfig,
    input: &Path,
    output: &Path,
    assignments: &[String],
    preset: Option<&str>,
) -> Result<()> {
    info!("Processing {} -> {}", input.display(), output.display());

    let mut processor = KeroMixProcessor::new();
    if let Some(name) = preset {
        let preset = PresetLibrary::new(&config.preset_dir).load(name)?;
        preset.apply_to(processor.params());
        info!("Loaded preset '{}'", preset.name);
    }
    apply_assignments(processor.params(), assignments)?;

    let mut file = read_wav(input)?;
    render(&mut processor, &mut file.buffer)?;
    write_wav(output, &file.buffer, file.spec)?;

    println!("=== KeroMix ===");
    println!("Input:  {}", input.display());
    println!("Output: {}", output.display());
    for channel in 0..file.buffer.num_channels() {
        println!(
            "Ch {}: peak {:.1} dBFS, rms {:.1} dBFS",
            channel,
            file.buffer.peak_db(channel),
            file.buffer.rms_db(channel)
        );
    }
    Ok(())
}

/// Ask for one suggestion against a WAV file's spectrum and apply it.
pub fn suggest(
    config: &EngineConfig,
    input: &Path,
    prompt: Option<&str>,
    quick: Option<usize>,
    output: Option<&Path>,
    locks: &[String],
    timeout: Duration,
) -> Result<()> {
    let prompt = match (prompt, quick) {
        (Some(text), _) => text.to_string(),
        (None, Some(index)) => QUICK_COMMANDS
            .get(index)
            .map(|s| s.to_string())
            .ok_or_else(|| KeroError::InvalidState {
                reason: format!(
                    "Quick command {} out of range (0-{})",
                    index,
                    QUICK_COMMANDS.len() - 1
                ),
            })?,
        (None, None) => {
            println!("Quick commands:");
            for (i, command) in QUICK_COMMANDS.iter().enumerate() {
                println!("  {}: {}", i, command);
            }
            return Ok(());
        }
    };

    let mut processor = KeroMixProcessor::new();
    let mut controller = MixController::new(
        config,
        Arc::clone(processor.params()),
        Arc::clone(processor.spectrum()),
    )?;

    for name in locks {
        let group = ParamGroup::from_name(name).ok_or_else(|| KeroError::InvalidState {
            reason: format!("Unknown lock group '{}'", name),
        })?;
        controller.set_group_locked(group, true);
    }

    // Analysis pass with the current values fills the spectrum window
    let file = read_wav(input)?;
    let mut analysis = file.buffer.clone();
    render(&mut processor, &mut analysis)?;
    if !controller.tick_spectrum() {
        warn!("Input shorter than one analysis window; spectrum left at floor");
    }
    println!("Spectrum: {}", controller.spectrum());
    println!("Request:  \"{}\"", prompt);

    if controller.request_suggestion(&prompt)?.is_none() {
        println!("Nothing to ask.");
        return Ok(());
    }
    println!("{}", controller.status());

    let report = match controller.wait_for_suggestion(timeout) {
        Some(Ok(report)) => report,
        Some(Err(err)) => {
            if let Some(details) = failure_details(&err) {
                warn!(raw = %details, "Suggestion reply had no usable mapping");
                println!("Reply was:\n{}", details);
            }
            return Err(err);
        }
        None => {
            println!("No answer within {}s.", timeout.as_secs());
            return Ok(());
        }
    };

    println!("{}", report.status_message());
    for (id, value) in &report.applied {
        println!("  {:<14} {}", id.as_str(), value);
    }
    for id in &report.skipped_locked {
        println!("  {:<14} (locked)", id.as_str());
    }
    for id in &report.ignored_unknown {
        println!("  {:<14} (unknown)", id);
    }

    if let Some(output) = output {
        let mut rendered = file.buffer;
        processor.reset();
        render(&mut processor, &mut rendered)?;
        write_wav(output, &rendered, file.spec)?;
        println!("Output saved to: {}", output.display());
    }
    Ok(())
}

/// The service's own text when a reply could not be used
fn failure_details(err: &KeroError) -> Option<String> {
    err.raw_response()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::to_string)
}

/// List saved presets.
pub fn preset_list(config: &EngineConfig) -> Result<()> {
    let library = PresetLibrary::new(&config.preset_dir);
    let names = library.list()?;
    if names.is_empty() {
        println!("No presets in {}", library.dir().display());
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// Save defaults plus overrides as a preset.
pub fn preset_save(config: &EngineConfig, name: &str, assignments: &[String]) -> Result<()> {
    let store = ParameterStore::new();
    apply_assignments(&store, assignments)?;
    let path = PresetLibrary::new(&config.preset_dir).save(name, &store.snapshot())?;
    println!("Saved: {}", path.display());
    Ok(())
}

/// Print a preset's values.
pub fn preset_load(config: &EngineConfig, name: &str) -> Result<()> {
    let preset = PresetLibrary::new(&config.preset_dir).load(name)?;
    println!("=== {} ({}) ===", preset.name, preset.saved_at.format("%Y-%m-%d %H:%M"));
    for (id, value) in &preset.params {
        println!("  {:<14} {}", id, value);
    }
    Ok(())
}

/// Delete a preset.
pub fn preset_delete(config: &EngineConfig, name: &str) -> Result<()> {
    PresetLibrary::new(&config.preset_dir).delete(name)?;
    println!("Deleted: {}", name.trim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("lowG=3.5").unwrap(), (ParamId::LowGain, 3.5));
        assert_eq!(
            parse_assignment(" revMix = 0.25 ").unwrap(),
            (ParamId::ReverbMix, 0.25)
        );
    }

    #[test_case("lowG" ; "no equals")]
    #[test_case("bogus=1" ; "unknown id")]
    #[test_case("lowG=loud" ; "not a number")]
    #[test_case("lowG=NaN" ; "not finite")]
    fn test_bad_assignment(text: &str) {
        assert!(parse_assignment(text).is_err());
    }

    #[test]
    fn test_failure_details_only_for_unusable_reply() {
        let unparseable = KeroError::UnparseableResponse {
            reason: "no JSON object".to_string(),
            raw: "  Try a touch more presence.\n".to_string(),
        };
        assert_eq!(
            failure_details(&unparseable).as_deref(),
            Some("Try a touch more presence.")
        );

        let blank = KeroError::UnparseableResponse {
            reason: "empty".to_string(),
            raw: " ".to_string(),
        };
        assert_eq!(failure_details(&blank), None);

        let transport = KeroError::TransportFailure {
            reason: "timed out".to_string(),
        };
        assert_eq!(failure_details(&transport), None);
    }

    #[test]
    fn test_render_matches_single_block() {
        let frames = RENDER_BLOCK * 3 + 17;
        let samples: Vec<f32> = (0..frames * 2)
            .map(|i| ((i as f32) * 0.01).sin() * 0.5)
            .collect();
        let source = AudioBuffer::from_interleaved(samples, 2, 48000.0).unwrap();

        let mut blocked = source.clone();
        let mut processor = KeroMixProcessor::new();
        processor.params().set(ParamId::DelayMix, 0.5);
        render(&mut processor, &mut blocked).unwrap();

        let mut whole = source;
        let mut other = KeroMixProcessor::new();
        other.params().set(ParamId::DelayMix, 0.5);
        other.prepare(48000.0, frames).unwrap();
        other.process_block(&mut whole);

        for (a, b) in blocked.samples().iter().zip(whole.samples()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
