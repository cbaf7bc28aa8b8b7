use console::style;

use crate::analysis::result::{ComprehensiveResult, Grade};
use crate::dsp::pitch::PitchTrack;

/// Print a scored comparison to the terminal.
pub fn print_result(result: &ComprehensiveResult) {
    let b = &result.breakdown;

    println!("{}", style("=== Performance Score ===").bold());
    println!();
    println!(
        "  Total:  {}  {}   ({} mode)",
        style(format!("{:.1}", b.total_score)).bold(),
        grade_label(b.grade),
        style(result.mode).cyan()
    );
    println!();

    print_score_line("Pitch", b.pitch_score, b.weights.pitch);
    print_score_line("Stability", b.stability_score, b.weights.stability);
    print_score_line("Timing", b.timing_score, b.weights.timing);
    println!();

    if result.aligned_pairs.is_empty() {
        println!(
            "  {} nothing to compare (no voiced pitch on one side)",
            style("SKIP").yellow()
        );
        return;
    }

    let p = &result.pitch;
    println!("{}", style("  Intonation").bold());
    println!("    In tune:   {}/{} pairs ({:.0}%)", p.accurate_pairs, p.voiced_pairs, p.accuracy_ratio * 100.0);
    println!("    Mean err:  {:.1} cents", p.mean_abs_cent_error);
    println!("    Max err:   {:.1} cents", p.max_abs_cent_error);
    println!("    Bias:      {:+.1} cents {}", p.mean_cent_bias, bias_label(p.mean_cent_bias));
    println!();

    let s = &result.stability;
    println!("{}", style("  Stability").bold());
    println!("    Std dev:   {:.1} cents", s.std_dev_cents);
    println!("    Stable:    {:.0}% of {} windows", s.stable_ratio * 100.0, s.segments.len());
    println!();

    let v = &result.vibrato;
    println!("{}", style("  Vibrato").bold());
    if v.has_vibrato {
        println!("    Rate:      {:.1} Hz", v.rate_hz);
        println!("    Depth:     {:.0} cents", v.depth_cents);
        println!("    Regular:   {:.0}/100", v.regularity_score);
    } else {
        println!("    {}", style("none detected").dim());
    }
    println!();

    let t = &result.timing;
    println!("{}", style("  Timing").bold());
    println!(
        "    On time:   {:.0}%  (early {}, late {})",
        t.on_time_ratio * 100.0,
        t.early_count,
        t.late_count
    );
    println!("    Offset:    {:+.0} ms mean, {:.0} ms worst", t.mean_offset_ms, t.max_abs_offset_ms);
}

/// Print a detected pitch sequence, one line per frame.
pub fn print_track(track: &PitchTrack) {
    let frame = track.frame_duration_secs();
    println!(
        "{} frames, chunk {} / step {} at {} Hz",
        style(track.pitches.len()).cyan(),
        track.layout.chunk_size,
        track.layout.step_size,
        track.sample_rate
    );
    for (i, &hz) in track.pitches.iter().enumerate() {
        let time = format!("{:8.3}s", i as f64 * frame);
        if hz > 0.0 {
            println!("  {}  {:7.1} Hz", time, hz);
        } else {
            println!("  {}  {}", time, style("      -").dim());
        }
    }
}

fn print_score_line(label: &str, score: f64, weight: f64) {
    println!(
        "  {:10} {:>6.1}  {}",
        label,
        score,
        style(format!("x{:.1}", weight)).dim()
    );
}

fn grade_label(grade: Grade) -> String {
    let text = format!("[{}]", grade);
    match grade {
        Grade::S | Grade::APlus | Grade::A => style(text).green().bold().to_string(),
        Grade::BPlus | Grade::B | Grade::CPlus | Grade::C => style(text).yellow().to_string(),
        _ => style(text).red().to_string(),
    }
}

fn bias_label(bias_cents: f64) -> String {
    if bias_cents.abs() < 10.0 {
        format!("{}", style("(centred)").green())
    } else if bias_cents > 0.0 {
        format!("{}", style("(sharp)").yellow())
    } else {
        format!("{}", style("(flat)").yellow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_labels() {
        assert!(bias_label(3.0).contains("centred"));
        assert!(bias_label(25.0).contains("sharp"));
        assert!(bias_label(-25.0).contains("flat"));
    }

    #[test]
    fn grade_label_contains_grade() {
        assert!(grade_label(Grade::BPlus).contains("[B+]"));
        assert!(grade_label(Grade::F).contains("[F]"));
    }
}
