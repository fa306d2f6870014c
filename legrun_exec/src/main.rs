//! Leg run simulation executable.
//!
//! # Architecture
//!
//! Runs the leg run controller in closed loop with a simple kinematic
//! vehicle:
//!
//!     - Initialise the controller from its parameter file
//!     - Main loop:
//!         - Apply any scripted parameter updates that are due
//!         - Build the input buffer from the vehicle state
//!         - Controller processing
//!         - Pick the best course and speed from the objective
//!         - Step the vehicle toward them
//!
//! The trajectory, the turn previews and the final status report are saved
//! into the session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use legrun_lib::{
    info::InfoBuffer,
    leg_run::{LegRunCtrl, Mode},
};
use util::{
    geom, host,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingParams, ScriptInterpreter},
    session::Session,
    time,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fastest the simulated vehicle can change heading.
const MAX_TURN_RATE_DEGS: f64 = 30.0;

/// Fastest the simulated vehicle can change speed.
const MAX_ACCEL_MSS: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "legrun_exec", about = "Leg run controller simulation")]
struct Opt {
    /// Parameter file, relative to the params directory
    #[structopt(short, long, default_value = "legrun.toml")]
    params: String,

    /// Timed parameter update script
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Length of the run in seconds
    #[structopt(short, long, default_value = "600")]
    duration: f64,

    /// Cycle period in seconds
    #[structopt(long, default_value = "0.25")]
    dt: f64,

    /// Override the vehicle name from the parameter file
    #[structopt(long)]
    vname: Option<String>,

    /// Vehicle start position as x,y
    #[structopt(long, default_value = "0,-40")]
    start: String,

    /// Lowest level written to the log: info, debug or trace
    #[structopt(long, default_value = "debug", parse(try_from_str = parse_level))]
    log_level: LevelFilter,
}

/// Simulated vehicle.
#[derive(Debug, Clone, Copy)]
struct Vehicle {
    pos_m: Vector2<f64>,
    heading_deg: f64,
    speed_ms: f64,
}

/// One recorded cycle of the run.
#[derive(Debug, Clone, Serialize)]
struct TrajPoint {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    heading_deg: f64,
    speed_ms: f64,
    mode: Mode,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Vehicle {
    /// Move the vehicle on by `dt_s`, turning and accelerating toward the
    /// demands at limited rates.
    fn step(&mut self, course_deg: Option<f64>, speed_ms: f64, dt_s: f64) {
        if let Some(crs) = course_deg {
            let err = geom::angle_180(crs - self.heading_deg);
            let max = MAX_TURN_RATE_DEGS * dt_s;
            self.heading_deg = geom::angle_360(self.heading_deg + err.max(-max).min(max));
        }

        let dv = (speed_ms - self.speed_ms).max(-MAX_ACCEL_MSS * dt_s).min(MAX_ACCEL_MSS * dt_s);
        self.speed_ms = (self.speed_ms + dv).max(0.0);

        self.pos_m = geom::project_point(self.heading_deg, self.speed_ms * dt_s, &self.pos_m);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("legrun_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(opt.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Leg Run Executable\n");
    info!(
        "Software root: {:?}",
        host::get_legrun_sw_root().wrap_err("LEGRUN_SW_ROOT is not set")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    if !(opt.dt > 0.0) {
        return Err(eyre!("Cycle period must be positive, found {}", opt.dt));
    }

    let start_m = parse_xy(&opt.start)
        .ok_or_else(|| eyre!("Could not parse start position \"{}\"", opt.start))?;

    // ---- LOAD SCRIPT ----

    let mut script = match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);
            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;
            info!(
                "Loaded script lasts {:.02} s and contains {} updates\n",
                si.get_duration(),
                si.get_num_pending()
            );
            Some(si)
        }
        None => None,
    };

    // ---- INITIALISE CONTROLLER ----

    let mut ctrl = LegRunCtrl::default();
    ctrl.init(opt.params.clone(), &session)
        .wrap_err("Failed to initialise LegRunCtrl")?;
    if let Some(ref vname) = opt.vname {
        ctrl.set_vname(vname.clone());
    }

    let mut veh = Vehicle {
        pos_m: start_m,
        heading_deg: 0.0,
        speed_ms: 0.0,
    };

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let wall_start = chrono::Utc::now();
    let mut traj: Vec<TrajPoint> = Vec::new();
    let mut last_mode = ctrl.mode();
    let mut time_s = 0.0;

    while time_s <= opt.duration {
        // ---- SCRIPTED UPDATES ----

        if let Some(ref mut si) = script {
            match si.get_pending(time_s) {
                PendingParams::None => (),
                PendingParams::Some(updates) => {
                    for u in updates.iter() {
                        info!("Script: {} = {}", u.key, u.value);
                        ctrl.set_param_str(&u.key, &u.value);
                    }
                    ctrl.settle();
                }
                PendingParams::EndOfScript => {
                    info!("End of script reached");
                    script = None;
                }
            }
        }

        // ---- CONTROLLER PROCESSING ----

        let input = InfoBuffer::with_nav(time_s, veh.pos_m, veh.heading_deg, veh.speed_ms);

        let (course_deg, speed_ms) = match ctrl.proc(&input) {
            Ok((output, report)) => {
                for p in output.postings.iter() {
                    debug!("{}", p);
                }

                if report.mode != last_mode {
                    info!("[{:.1} s] {} -> {}", time_s, last_mode, report.mode);
                    last_mode = report.mode;
                }

                match output.objective {
                    Some(ref obj) => obj.best(ctrl.builder()),
                    None => (None, None),
                }
            }
            Err(e) => {
                warn!("Error during LegRunCtrl processing: {}", e);
                (None, None)
            }
        };

        // ---- VEHICLE ----

        veh.step(course_deg, speed_ms.unwrap_or(0.0), opt.dt);

        traj.push(TrajPoint {
            time_s,
            x_m: veh.pos_m.x,
            y_m: veh.pos_m.y,
            heading_deg: veh.heading_deg,
            speed_ms: veh.speed_ms,
            mode: ctrl.mode(),
        });

        if ctrl.finished() {
            info!("Leg run complete after {:.1} s", time_s);
            break;
        }

        time_s += opt.dt;
    }

    // ---- SHUTDOWN ----

    let elapsed = time::duration_to_seconds(chrono::Utc::now().signed_duration_since(wall_start));
    let (c1, c2) = ctrl.leg_counts();
    info!(
        "Simulated {:.1} s in {:.3} s: {} turns, {} + {} legs",
        time_s,
        elapsed.unwrap_or(std::f64::NAN),
        ctrl.turn_count(),
        c1,
        c2
    );

    match serde_json::to_string(ctrl.report()) {
        Ok(s) => info!("Final status: {}", s),
        Err(e) => warn!("Could not serialise the final status: {}", e),
    }

    session.save("trajectory.json", traj);
    session.save("previews.json", ctrl.previews());
    session.save("final_status.json", *ctrl.report());
    session.exit();

    Ok(())
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    match s.to_lowercase().as_str() {
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(format!("Expected info, debug or trace, found \"{}\"", s)),
    }
}

/// Parse an `x,y` pair.
fn parse_xy(s: &str) -> Option<Vector2<f64>> {
    let mut it = s.split(',').map(|v| v.trim().parse::<f64>());
    match (it.next(), it.next(), it.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Some(Vector2::new(x, y)),
        _ => None,
    }
}
