use std::io;
use std::io::{BufRead, Read};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, warn};

/// 입력 스레드와 시그널 스레드가 셸에 전달하는 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(String),

    /// 입력 종료 또는 인터럽트 시그널 (SIGINT)
    Closed,
}

/// 중단 가능한 표준 입력
///
/// # Description
/// 표준 입력은 별도 스레드에서 줄 단위로 읽어 채널로 전달한다.
/// 인터럽트 시그널도 같은 채널로 [`Event::Closed`]를 보내기 때문에
/// 셸은 Ctrl-C를 입력 종료(EOF)와 똑같이 처리하고 정상 종료 경로를 따른다.
pub struct InterruptibleInput {
    receiver: Receiver<Event>,
    buffer: Vec<u8>,
    position: usize,
    closed: bool,
}

impl InterruptibleInput {
    pub fn new(receiver: Receiver<Event>) -> Self {
        Self {
            receiver,
            buffer: Vec::new(),
            position: 0,
            closed: false,
        }
    }

    /// 표준 입력을 읽는 스레드와 SIGINT를 기다리는 스레드를 시작한다.
    pub fn stdin() -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel();

        watch_interrupt(sender.clone())?;

        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(Event::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Cannot read standard input: {}", e);
                        break;
                    }
                }
            }
            let _ = sender.send(Event::Closed);
        });

        Ok(Self::new(receiver))
    }
}

#[cfg(unix)]
fn watch_interrupt(sender: Sender<Event>) -> io::Result<()> {
    use signal_hook::consts::SIGINT;
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT])?;
    thread::spawn(move || {
        for signal in signals.forever() {
            debug!("Signal received: {}", signal);
            if sender.send(Event::Closed).is_err() {
                return;
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn watch_interrupt(_: Sender<Event>) -> io::Result<()> {
    Ok(())
}

impl Read for InterruptibleInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for InterruptibleInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.position >= self.buffer.len() && !self.closed {
            match self.receiver.recv() {
                Ok(Event::Line(line)) => {
                    self.buffer = line.into_bytes();
                    self.buffer.push(b'\n');
                    self.position = 0;
                }
                Ok(Event::Closed) | Err(_) => {
                    self.closed = true;
                    self.buffer.clear();
                    self.position = 0;
                }
            }
        }

        Ok(&self.buffer[self.position..])
    }

    fn consume(&mut self, amt: usize) {
        self.position = (self.position + amt).min(self.buffer.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_read_until_closed() {
        let (sender, receiver) = mpsc::channel();
        sender.send(Event::Line("1".to_owned())).unwrap();
        sender.send(Event::Line("Ace".to_owned())).unwrap();
        sender.send(Event::Closed).unwrap();
        sender.send(Event::Line("ignored".to_owned())).unwrap();

        let mut input = InterruptibleInput::new(receiver);
        let mut line = String::new();

        assert_eq!(input.read_line(&mut line).unwrap(), 2);
        assert_eq!(line, "1\n");

        line.clear();
        input.read_line(&mut line).unwrap();
        assert_eq!(line, "Ace\n");

        line.clear();
        assert_eq!(input.read_line(&mut line).unwrap(), 0);
        assert_eq!(input.read_line(&mut line).unwrap(), 0);
    }

    #[test]
    fn dropped_sender_ends_input() {
        let (sender, receiver) = mpsc::channel::<Event>();
        drop(sender);

        let mut input = InterruptibleInput::new(receiver);
        let mut line = String::new();
        assert_eq!(input.read_line(&mut line).unwrap(), 0);
    }
}
