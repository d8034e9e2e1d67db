//! 텔레그램 알림 서비스.
//!
//! Telegram Bot API `sendMessage`로 발행된 시그널을 HTML 메시지로 전송합니다.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use scanner_core::{Direction, Signal, TelegramConfig};

use crate::types::{NotificationError, NotificationResult, NotificationSender};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 텔레그램 알림 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramSender {
    /// 새 텔레그램 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// API 기본 URL 변경 (테스트 서버 등).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// 시그널을 텔레그램 메시지로 포맷합니다.
    fn format_message(signal: &Signal) -> String {
        let side_emoji = match signal.direction {
            Direction::Long => "🟢",
            Direction::Short => "🔴",
        };
        let direction = signal.direction.as_str().to_uppercase();
        let symbol = escape_html(&signal.symbol);

        format!(
            "{side_emoji} <b>{direction} 시그널</b> ({action})\n\n\
             심볼: <code>{symbol}</code> {timeframe}\n\
             패턴: {pattern}\n\
             진입가: {entry}\n\
             손절가: {stop}\n\
             목표가: {tp1} / {tp2}\n\
             R:R {rr:.2} · 레버리지 {leverage}x\n\
             점수: <b>{score:.1}</b> (신뢰도 {confidence:.0}%)",
            action = signal.action,
            timeframe = signal.timeframe,
            pattern = signal.pattern_type,
            entry = signal.entry_price,
            stop = signal.stop_loss,
            tp1 = signal.take_profit_1,
            tp2 = signal.take_profit_2,
            rr = signal.risk_reward_ratio,
            leverage = signal.leverage,
            score = signal.entry_score,
            confidence = signal.confidence * 100.0,
        )
    }

    /// 텔레그램에 원시 메시지를 전송합니다.
    async fn send_message(&self, text: &str) -> NotificationResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token);

        let params = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        debug!(chat_id = %self.config.chat_id, "Sending Telegram message");

        let response = self.client.post(&url).json(&params).send().await?;

        if response.status().is_success() {
            info!("Telegram notification sent");
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            warn!("Telegram rate limited");
            return Err(NotificationError::RateLimited(60));
        }

        error!(status = %status, body = %body, "Failed to send Telegram message");
        Err(NotificationError::SendFailed(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(&self, signal: &Signal) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Telegram notifications are disabled, skipping");
            return Ok(());
        }

        let message = Self::format_message(signal);
        self.send_message(&message).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
