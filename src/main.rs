use std::io::{self, Write};

use tracing_subscriber::EnvFilter;

use clusterwise::{GenParams, Norm, Player, Simulation, DEFAULT_CADENCE, MAX_CLUSTERS, spawn_visualizer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut params = GenParams::default();
    let mut norm = Norm::Squared;
    let mut new_seed_on_reset = true;

    let player = Player::new(Simulation::new(params.clone(), norm)?);
    spawn_visualizer(player.shared());

    println!("\n╭──────────────────────────────────────────────╮");
    println!("│       clusterwise regression lab             │");
    println!("│                                              │");
    println!("│ alternate per-group line fits with           │");
    println!("│ error-driven reassignment until no           │");
    println!("│ sample changes group                         │");
    println!("│                                              │");
    println!("│ /step /run /pause /reset /state /quit        │");
    println!("│ /clusters <k>   groups, 2..={}                │", MAX_CLUSTERS);
    println!("│ /points <n>     samples per group            │");
    println!("│ /noise <s>      gaussian noise scale         │");
    println!("│ /norm <1|2>     absolute or squared error    │");
    println!("│ /seed <n|keep|new>  reset seed policy        │");
    println!("╰──────────────────────────────────────────────╯\n");

    loop {
        print!("you: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");
        let arg = parts.next();

        match command {
            "/quit" => break,
            "/step" => match player.step_once() {
                Ok(()) => report(&player),
                Err(err) => println!("step failed: {err}\n"),
            },
            "/run" => {
                player.run(DEFAULT_CADENCE);
                println!("autoplay on (1 step/second until convergence)\n");
            }
            "/pause" => {
                player.pause();
                println!("autoplay off\n");
            }
            "/reset" => {
                if new_seed_on_reset {
                    params.seed = rand::random::<u32>() as u64;
                }
                match player.reset(params.clone(), norm) {
                    Ok(()) => println!("regenerated with seed {}\n", params.seed),
                    Err(err) => println!("reset rejected: {err}\n"),
                }
            }
            "/state" => {
                let snapshot = player.snapshot();
                println!("{}\n", serde_json::to_string_pretty(&snapshot)?);
            }
            "/clusters" => match arg.and_then(|a| a.parse::<usize>().ok()) {
                Some(k) if (2..=MAX_CLUSTERS).contains(&k) => {
                    params.clusters = k;
                    apply(&player, &mut params, norm, new_seed_on_reset);
                }
                _ => println!("usage: /clusters <2..={MAX_CLUSTERS}>\n"),
            },
            "/points" => match arg.and_then(|a| a.parse::<usize>().ok()) {
                Some(n) if (1..=1000).contains(&n) => {
                    params.points_per_cluster = n;
                    apply(&player, &mut params, norm, new_seed_on_reset);
                }
                _ => println!("usage: /points <1..=1000>\n"),
            },
            "/noise" => match arg.and_then(|a| a.parse::<f64>().ok()) {
                Some(s) if (0.0..=10.0).contains(&s) => {
                    params.noise = s;
                    apply(&player, &mut params, norm, new_seed_on_reset);
                }
                _ => println!("usage: /noise <0.0..=10.0>\n"),
            },
            "/norm" => match arg {
                Some("1") => {
                    norm = Norm::Absolute;
                    apply(&player, &mut params, norm, new_seed_on_reset);
                }
                Some("2") => {
                    norm = Norm::Squared;
                    apply(&player, &mut params, norm, new_seed_on_reset);
                }
                _ => println!("usage: /norm <1|2>\n"),
            },
            "/seed" => match arg {
                Some("keep") => {
                    new_seed_on_reset = false;
                    println!("reset reuses seed {}\n", params.seed);
                }
                Some("new") => {
                    new_seed_on_reset = true;
                    println!("reset draws a fresh seed\n");
                }
                Some(raw) => match raw.parse::<u64>() {
                    Ok(seed) => {
                        params.seed = seed;
                        new_seed_on_reset = false;
                        apply(&player, &mut params, norm, false);
                    }
                    Err(_) => println!("usage: /seed <integer|keep|new>\n"),
                },
                None => println!("usage: /seed <integer|keep|new>\n"),
            },
            _ => println!("unknown command: {command}\n"),
        }
    }

    Ok(())
}

/// Parameter changes regenerate immediately, like hitting "apply" in a UI.
fn apply(player: &Player, params: &mut GenParams, norm: Norm, new_seed: bool) {
    if new_seed {
        params.seed = rand::random::<u32>() as u64;
    }
    match player.reset(params.clone(), norm) {
        Ok(()) => println!(
            "applied: {} groups x {} points, noise {}, seed {}\n",
            params.clusters, params.points_per_cluster, params.noise, params.seed
        ),
        Err(err) => println!("parameters rejected: {err}\n"),
    }
}

fn report(player: &Player) {
    let snap = player.snapshot();
    if snap.is_converged() {
        println!("converged at iteration {}\n", snap.iteration());
    } else {
        println!("iteration {}\n", snap.iteration());
    }
}
