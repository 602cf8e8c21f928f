use std::env;
use std::io;
use std::panic;
use std::sync::mpsc as std_mpsc;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc as tokio_mpsc;

use nexstar::tui::app::App;
use nexstar::tui::event::{AppEvent, EventHandler};
use nexstar::tui::message::{MountCommand, MountEvent};
use nexstar::tui::mount_task;
use nexstar::tui::ui;
use nexstar_protocol::HandControl;
use nexstar_protocol::protocol::BAUD_RATE;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Optional first argument names the serial port; otherwise probe them all.
    let port_name = env::args().nth(1);

    println!("NexStar Hand Control");
    println!("====================");
    let connected = match &port_name {
        Some(name) => {
            println!("Connecting on {name}...");
            HandControl::open(name)
        }
        None => {
            println!("Searching serial ports for a hand control...");
            HandControl::auto_connect()
        }
    };

    let hc = match connected {
        Ok(hc) => {
            println!("Connected.");
            hc
        }
        Err(e) => {
            eprintln!("Failed to connect: {e}");
            eprintln!();
            eprintln!("Troubleshooting:");
            eprintln!("  1. Plug the serial cable into the port at the base of the hand control");
            eprintln!("  2. Power on the mount and wait for the hand control to finish booting");
            eprintln!("  3. Finish or skip the alignment prompt so the hand control accepts commands");
            eprintln!("  4. Check that no other program (e.g. planetarium software) holds the port");
            eprintln!("  5. Pass the port name explicitly, e.g. `nexstar /dev/ttyUSB0` or `nexstar COM3`");
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    rt.block_on(async {
        // TUI -> mount: std mpsc, the mount thread blocks on serial I/O.
        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        // Mount -> TUI: tokio unbounded, polled from the event handler.
        let (mount_event_tx, mount_event_rx) = tokio_mpsc::unbounded_channel::<MountEvent>();

        let mount = tokio::task::spawn_blocking(move || {
            mount_task::mount_loop(hc, cmd_rx, mount_event_tx);
        });

        let result = run_tui(cmd_tx, mount_event_rx, BAUD_RATE).await;

        // The sender is gone by now, so the mount task stops the slew and closes the port.
        let _ = mount.await;

        if let Err(e) = result {
            eprintln!("TUI error: {e}");
            std::process::exit(1);
        }
    });
}

async fn run_tui(
    cmd_tx: std_mpsc::Sender<MountCommand>,
    mount_event_rx: tokio_mpsc::UnboundedReceiver<MountEvent>,
    baud_rate: u32,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal on panic.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(info);
    }));

    let mut app = App::new(cmd_tx, baud_rate);
    let mut events = EventHandler::new(mount_event_rx);

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            AppEvent::Key(key) => app.handle_key(key),
            AppEvent::Mount(mount_event) => app.handle_mount_event(mount_event),
            AppEvent::Tick => {}
        }

        if app.should_quit {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}
