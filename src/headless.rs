use crate::key_script::KeyScriptPlayer;
use anyhow::Result;
use pong_sync_client::{Lifecycle, SyncClient};
use pong_sync_core::{Direction, GameObject, GameState, Input, SessionState, Simulation, Slot};
use pong_sync_net::Connector;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const FIELD_WIDTH: f64 = 800.0;
const FIELD_HEIGHT: f64 = 600.0;
const PADDLE_WIDTH: u16 = 10;
const PADDLE_HEIGHT: u16 = 80;
const PADDLE_SPEED: f64 = 300.0;
const BALL_ID: u16 = 2;
const BALL_RADIUS: u16 = 8;

/// Minimal field used when no renderer-backed simulation is attached.
///
/// Paddles follow the composed inputs and the ball bounces off the walls.
/// There is no scoring.
pub struct HeadlessField {
    paddles: [f64; 2],
    ball: (f64, f64),
    ball_vel: (f64, f64),
}

impl Default for HeadlessField {
    fn default() -> Self {
        Self {
            paddles: [FIELD_HEIGHT / 2.0; 2],
            ball: (FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0),
            ball_vel: (180.0, 120.0),
        }
    }
}

impl HeadlessField {
    fn paddle(&self, slot: Slot) -> GameObject {
        let x = match slot {
            Slot::One => 20.0,
            Slot::Two => FIELD_WIDTH - 20.0,
        };
        GameObject {
            id: slot.paddle_object_id(),
            x,
            y: self.paddles[slot.paddle_object_id() as usize],
            orientation_x: 0.0,
            orientation_y: 1.0,
            vel_x: 0.0,
            vel_y: 0.0,
            shape_param_1: PADDLE_WIDTH,
            shape_param_2: PADDLE_HEIGHT,
        }
    }
}

impl Simulation for HeadlessField {
    fn step(&mut self, inputs: &[Input], dt_seconds: f64) {
        let half = f64::from(PADDLE_HEIGHT) / 2.0;
        for input in inputs {
            let delta = match input.direction {
                Direction::Up => -PADDLE_SPEED * dt_seconds,
                Direction::Down => PADDLE_SPEED * dt_seconds,
            };
            if let Some(y) = self.paddles.get_mut(input.object_id as usize) {
                *y = (*y + delta).clamp(half, FIELD_HEIGHT - half);
            }
        }

        let (mut x, mut y) = self.ball;
        x += self.ball_vel.0 * dt_seconds;
        y += self.ball_vel.1 * dt_seconds;
        let r = f64::from(BALL_RADIUS);
        if x < r || x > FIELD_WIDTH - r {
            self.ball_vel.0 = -self.ball_vel.0;
            x = x.clamp(r, FIELD_WIDTH - r);
        }
        if y < r || y > FIELD_HEIGHT - r {
            self.ball_vel.1 = -self.ball_vel.1;
            y = y.clamp(r, FIELD_HEIGHT - r);
        }
        self.ball = (x, y);
    }

    fn objects(&self) -> Vec<GameObject> {
        vec![
            self.paddle(Slot::One),
            self.paddle(Slot::Two),
            GameObject {
                id: BALL_ID,
                x: self.ball.0,
                y: self.ball.1,
                orientation_x: 1.0,
                orientation_y: 0.0,
                vel_x: self.ball_vel.0,
                vel_y: self.ball_vel.1,
                shape_param_1: BALL_RADIUS,
                shape_param_2: 0,
            },
        ]
    }

    fn state(&self) -> GameState {
        GameState::default()
    }
}

pub struct RunOptions {
    pub max_frames: Option<u64>,
    pub key_script: Option<KeyScriptPlayer>,
}

/// Drive frames until the frame limit, the session closing or Ctrl-C.
pub async fn run<C: Connector>(client: &mut SyncClient<C>, mut opts: RunOptions) -> Result<u64> {
    let mut field = HeadlessField::default();
    let frame_interval = client.config().frame_interval();
    let mut ticker = time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let started = Instant::now();
    let mut last = started;
    let mut frames = 0u64;
    let mut was_connected = client.is_connected();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted after {} frames", frames);
                break;
            }
            now = ticker.tick() => {
                if let Some(script) = opts.key_script.as_mut() {
                    let elapsed = now.duration_since(started).as_millis() as u64;
                    for step in script.advance(elapsed) {
                        if step.pressed {
                            client.press(step.key);
                        } else {
                            client.release(step.key);
                        }
                    }
                }

                let inputs = client.frame(&mut field, now.duration_since(last));
                last = now;
                frames += 1;
                debug!(frame = frames, ?inputs, "Frame");

                if let Some(tick) = client.next_tick() {
                    debug!(ts = tick.ts, player = %tick.player_id, "Relayed snapshot");
                }

                let connected = client.is_connected();
                if was_connected && !connected {
                    warn!("Connection lost; continuing without network updates");
                }
                was_connected = connected;

                if client.lifecycle() == Lifecycle::Closed
                    || client.session().is_some_and(|s| s.state() == SessionState::Closed)
                {
                    info!("Session closed after {} frames", frames);
                    break;
                }
                if opts.max_frames.is_some_and(|max| frames >= max) {
                    info!("Frame limit reached ({})", frames);
                    break;
                }
            }
        }
    }

    if let Some(status) = client.latest_status() {
        info!(
            "Last score {} : {}",
            status.state.score.player_1, status.state.score.player_2
        );
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paddles_follow_inputs_and_stay_on_field() {
        let mut field = HeadlessField::default();
        let start = field.paddle(Slot::One).y;

        field.step(&[Input::paddle(Direction::Up, Slot::One)], 0.1);
        assert!(field.paddle(Slot::One).y < start);
        assert_eq!(field.paddle(Slot::Two).y, start);

        for _ in 0..100 {
            field.step(&[Input::paddle(Direction::Down, Slot::Two)], 0.1);
        }
        let bottom = FIELD_HEIGHT - f64::from(PADDLE_HEIGHT) / 2.0;
        assert_eq!(field.paddle(Slot::Two).y, bottom);
    }

    #[test]
    fn ball_stays_inside_the_field() {
        let mut field = HeadlessField::default();
        for _ in 0..1_000 {
            field.step(&[], 0.05);
        }
        let ball = field.objects()[2];
        assert!(ball.x >= 0.0 && ball.x <= FIELD_WIDTH);
        assert!(ball.y >= 0.0 && ball.y <= FIELD_HEIGHT);
    }
}
