/// Values the CLI falls back to when neither the config file nor an argument sets them.
pub struct DefaultsConfig {
    pub seed: u64,
    pub global_iterations: usize,
    pub keep: usize,
    pub space_radius: f64,
    pub heat_pulses: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            global_iterations: 1000,
            keep: 1,
            space_radius: 10.0,
            heat_pulses: false,
        }
    }
}
