/// Receives human-facing progress lines from the pipeline.
pub trait Reporter {
    /// Status line emitted before a step starts.
    fn step(&mut self, message: &str);

    /// Secondary information about the current step.
    fn note(&mut self, message: &str);
}

/// Writes progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn step(&mut self, message: &str) {
        println!("==> {message}");
    }

    fn note(&mut self, message: &str) {
        println!("    {message}");
    }
}

/// Collects progress lines, prefixing notes with two spaces.
impl Reporter for Vec<String> {
    fn step(&mut self, message: &str) {
        self.push(message.to_owned());
    }

    fn note(&mut self, message: &str) {
        self.push(format!("  {message}"));
    }
}
