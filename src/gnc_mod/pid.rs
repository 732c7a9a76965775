// ---------------------------------------------------------------------------
// PID with hard output clamp (single axis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClampedPid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub min_output: f64,
    pub max_output: f64,
    integral: f64,
    prev_error: Option<f64>,
}

impl ClampedPid {
    pub fn new(kp: f64, ki: f64, kd: f64, min_output: f64, max_output: f64) -> Self {
        Self { kp, ki, kd, min_output, max_output, integral: 0.0, prev_error: None }
    }

    /// Proportional-only controller clamped to `±limit`.
    pub fn proportional(kp: f64, limit: f64) -> Self {
        Self::new(kp, 0.0, 0.0, -limit.abs(), limit.abs())
    }

    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if !error.is_finite() {
            return 0.0;
        }
        let derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.prev_error = Some(error);

        let unclamped = self.kp * error + self.ki * (self.integral + error * dt) + self.kd * derivative;
        let out = unclamped.clamp(self.min_output, self.max_output);
        // Anti-windup: only integrate while the output is not saturated
        if out == unclamped && dt > 0.0 {
            self.integral += error * dt;
        }
        out
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }
}
