/// Fixed-step simulation clock. Cooldowns compare against `elapsed`.
#[derive(Debug, Clone)]
pub struct StepClock {
    pub dt: f32,
    pub elapsed: f32,
    pub steps: u64,
}

impl StepClock {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            elapsed: 0.0,
            steps: 0,
        }
    }

    pub fn tick(&mut self) {
        self.elapsed += self.dt;
        self.steps += 1;
    }
}
