use pong_sync_client::{ClientConfig, Lifecycle, StartRequest, SyncClient};
use pong_sync_core::{Direction, GameObject, GameState, Input, Simulation, Slot};
use std::io::Write;
use std::time::Duration;
use winit::keyboard::KeyCode;

#[derive(Default)]
struct Recorder {
    steps: Vec<Vec<Input>>,
}

impl Simulation for Recorder {
    fn step(&mut self, inputs: &[Input], _dt_seconds: f64) {
        self.steps.push(inputs.to_vec());
    }

    fn objects(&self) -> Vec<GameObject> {
        Vec::new()
    }

    fn state(&self) -> GameState {
        GameState::default()
    }
}

#[tokio::test(start_paused = true)]
async fn local_session_drives_both_paddles_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("can create temp config");
    writeln!(file, "local_setup_delay_ms = 50").expect("can write config");
    let config = ClientConfig::load_from_path(file.path());
    assert_eq!(config.local_setup_delay(), Duration::from_millis(50));

    let mut client = SyncClient::from_config(config).expect("default bases are valid");
    client.start(StartRequest::Local).await.expect("local start");
    assert_eq!(client.lifecycle(), Lifecycle::Running);
    assert!(!client.is_connected());

    client.press(KeyCode::KeyW);
    client.press(KeyCode::ArrowDown);
    let mut sim = Recorder::default();
    let inputs = client.frame(&mut sim, Duration::from_millis(16));

    assert_eq!(
        inputs,
        vec![
            Input::paddle(Direction::Up, Slot::One),
            Input::paddle(Direction::Down, Slot::Two),
        ]
    );
    assert_eq!(sim.steps, vec![inputs]);

    client.reset();
    assert_eq!(client.lifecycle(), Lifecycle::Uninitialized);
    assert!(client.session().is_none());
}
