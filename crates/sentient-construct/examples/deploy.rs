//! Example: deploying constructors and building environments from them
//!
//! Every constructor is sent through a JSON payload first, the way it would
//! be shipped to a worker, and the loaded copy is invoked twice.

use std::any::Any;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use sentient_construct::{
    bind, bind_named, constructed_by, constructor, transport, CallFn, Constructor,
    ConstructorExt, CopyMemo, CopyMode, Duplicate, Preconstructed, Shared,
};

#[derive(Parser)]
#[command(name = "deploy")]
#[command(about = "Walk through constructor binding scenarios")]
struct Cli {
    /// Copy mode for the shared-world scenario (none, shallow, deep)
    #[arg(short, long, default_value = "shallow")]
    copy_mode: String,
}

constructor! {
    /// Recommended practice: a serializable record with defaults applied up front
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ExampleEnvCon {
        pub width: u32,
        pub height: u32,
    }
}

impl ExampleEnvCon {
    fn new(width: u32, height: Option<u32>) -> Self {
        Self {
            width,
            height: height.unwrap_or(width),
        }
    }
}

#[derive(Debug)]
pub struct ExampleEnv {
    width: u32,
    height: u32,
    world: Vec<Vec<u8>>,
}

impl ExampleEnv {
    fn fill_world(&mut self) {
        println!("creating ExampleEnv with {}, {}", self.width, self.height);
        self.world = vec![vec![0; self.width as usize]; self.height as usize];
    }
}

constructed_by!(ExampleEnvCon => ExampleEnv { width, height; world }, construct = ExampleEnv::fill_world);

constructor! {
    /// Minimal practice: fields only, no helpers
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MinimalEnvCon {
        pub width: u32,
        pub height: u32,
    }
}

#[derive(Debug)]
pub struct MinimalEnv {
    width: u32,
    height: u32,
}

constructed_by!(MinimalEnvCon => MinimalEnv { width, height });

/// Defines its own call, so it cannot be bound
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErroneousCon {
    pub width: u32,
}

fn erroneous_call(this: &ErroneousCon) -> Box<dyn Any + Send> {
    Box::new(format!("oh no! {}", this.width))
}

impl Constructor for ErroneousCon {
    fn own_call() -> Option<CallFn<Self>> {
        Some(erroneous_call as CallFn<Self>)
    }
}

impl Duplicate for ErroneousCon {
    fn alias(&self) -> Self {
        self.clone()
    }

    fn deep_copy(&self, _memo: &mut CopyMemo) -> Self {
        self.clone()
    }
}

#[allow(dead_code)]
pub struct ErroneousEnv {
    width: u32,
}

constructed_by!(ErroneousCon => ErroneousEnv { width });

constructor! {
    /// Constructor whose target mutates the shared world it is given
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CopyCon {
        pub x: String,
        pub world: Shared<Vec<String>>,
    }
}

#[derive(Debug)]
pub struct CopyEnv {
    x: String,
    world: Shared<Vec<String>>,
}

impl CopyEnv {
    fn populate(&mut self) {
        self.world.write().push("item".into());
        println!("populating world CopyEnv {}: {:?}", self.x, *self.world.read());
    }
}

constructed_by!(CopyCon => CopyEnv { x, world }, construct = CopyEnv::populate);

constructor! {
    /// Never bound, to show the diagnostic
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ForgottenCon {
        pub width: u32,
    }
}

#[allow(dead_code)]
pub struct SecondEnv {
    width: u32,
}

constructed_by!(ExampleEnvCon => SecondEnv { width });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyEnv {
    name: String,
}

sentient_construct::duplicate_fields!(MyEnv { name });

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Recommended practice
    bind::<ExampleEnvCon, ExampleEnv>(CopyMode::None)?;
    let loaded = transport(&ExampleEnvCon::new(8, None))?;
    let first: ExampleEnv = loaded.build()?;
    let second: ExampleEnv = loaded.build()?;
    println!("instance {first:?}");
    println!("second instance {second:?}\n");

    // Minimal practice
    bind::<MinimalEnvCon, MinimalEnv>(CopyMode::default())?;
    let loaded = transport(&MinimalEnvCon {
        width: 8,
        height: 8,
    })?;
    let first: MinimalEnv = loaded.build()?;
    let second: MinimalEnv = loaded.build()?;
    println!("instance {first:?}");
    println!("second instance {second:?}\n");

    // Binding the same constructor twice
    if let Err(err) = bind::<ExampleEnvCon, SecondEnv>(CopyMode::None) {
        println!("Error message resulting from repeated binding:\n{err}\n");
    }

    // Binding a constructor that already defines its own call
    if let Err(err) = bind::<ErroneousCon, ErroneousEnv>(CopyMode::None) {
        println!("Error message resulting from a custom call:\n{err}\n");
    }

    // Forgetting to bind
    if let Err(err) = (ForgottenCon { width: 8 }).call() {
        println!("Error message resulting from a forgotten binding:\n{err}\n");
    }

    // Shared world, copy mode taken from the command line
    bind_named::<CopyCon, CopyEnv>(&cli.copy_mode)
        .with_context(|| format!("binding CopyCon with copy mode `{}`", cli.copy_mode))?;
    let loaded = transport(&CopyCon {
        x: "x".into(),
        world: Shared::new(vec!["from_constructor".into()]),
    })?;
    let first: CopyEnv = loaded.build()?;
    let second: CopyEnv = loaded.build()?;
    println!("constructor world after two builds: {:?}", *loaded.world.read());
    println!("second instance world: {:?}\n", *second.world.read());
    drop(first);

    // Pre-built values
    let pre = transport(&Preconstructed::new(MyEnv {
        name: "Preconstructed MyEnv".into(),
    }))?;
    let instance: MyEnv = pre.build()?;
    println!("instance {instance:?}");
    println!("second instance {:?}", pre.make());

    Ok(())
}
