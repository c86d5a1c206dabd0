pub mod clock;
pub mod config;
pub mod logger;
pub mod poller;
pub mod record;
pub mod server;

/// 라이브러리 로드 시 .env 파일을 한 번 읽어 환경 변수로 등록
#[ctor::ctor]
fn load_dotenv() {
    let _ = dotenv::dotenv();
}
