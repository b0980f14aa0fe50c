use clap::Parser;
use serde::Serialize;
use tracing::info;

use sprig::{middleware, Context, Engine, Server, Status};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
}

#[derive(Serialize)]
struct Profile {
    name: String,
    age: u8,
}

fn main() {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut engine = Engine::new();
    engine.wrap(middleware::logger::new());
    engine.wrap(middleware::recovery::new());

    {
        let mut gg = engine.scope("/gg");
        gg.get("/hello/:lan/cc", |c: &mut Context| -> anyhow::Result<()> {
            let lan = c.param("lan").unwrap_or("?").to_owned();
            c.html(Status::OK, format!("<h1>hello, {}</h1>", lan));
            Ok(())
        });
    }

    engine.get("/profile", |c: &mut Context| -> anyhow::Result<()> {
        c.json(
            Status::OK,
            &Profile {
                name: "gopher".to_owned(),
                age: 18,
            },
        )
    });

    engine.get("/static/*file", |c: &mut Context| -> anyhow::Result<()> {
        let file = c.param("file").unwrap_or("").to_owned();
        c.string(Status::OK, format!("would serve {}", file));
        Ok(())
    });

    info!("listening on {}", args.addr);
    Server::new(&args.addr).run(engine);
}
