#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    atestado_matricula_server::run().await
}
