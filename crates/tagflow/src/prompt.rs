use std::io::Write;
use tagflow_cloud::Confirm;

/// 端末で y/N を尋ねる
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{}", prompt);
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(_) => is_yes(&input),
            Err(_) => false,
        }
    }
}

/// 先頭が y なら yes。空入力は N
pub fn is_yes(input: &str) -> bool {
    input
        .trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}
