use gesture_arm::{CalibrationProfile, Config, JointId};

pub fn render_profile(config: &Config, profile: &CalibrationProfile) -> String {
    let mut lines = vec![
        "◆ gesture-arm calibration".to_string(),
        String::new(),
        format!("Version      {}", env!("CARGO_PKG_VERSION")),
        format!("Config       {}", config.config_path.display()),
        format!(
            "Port         {} @ {} baud",
            profile.link.port, profile.link.baud
        ),
        format!(
            "Motion       alpha {:.2}, max {:.1}°/tick, min send {:.1}°",
            profile.filter.alpha, profile.filter.max_delta_per_tick, profile.filter.min_send_delta
        ),
        format!(
            "Tick         {} ms{}",
            profile.session.tick_interval.as_millis(),
            profile
                .session
                .keep_alive
                .map(|k| format!(", keep-alive {} ms", k.as_millis()))
                .unwrap_or_default()
        ),
        format!(
            "Confidence   >= {:.2}",
            profile.mapper.confidence_threshold
        ),
        String::new(),
        format!(
            "  {:<10}{:>5}{:>6}{:>6}{:>6}",
            "joint", "pin", "min", "max", "rest"
        ),
    ];

    for joint in JointId::ALL {
        let limits = profile.limits(joint);
        lines.push(format!(
            "  {:<10}{:>5}{:>6}{:>6}{:>6}",
            joint.name(),
            limits.pin,
            limits.min_angle,
            limits.max_angle,
            profile.rest[joint]
        ));
    }

    lines.join("\n")
}
