use crate::engine::models::Language;
use crate::engine::state::{InstallAction, OperationKind};

#[derive(Debug, Clone, Copy)]
pub struct I18n {
    language: Language,
}

impl I18n {
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    fn pick<'a>(self, vietnamese: &'a str, english: &'a str, japanese: &'a str) -> &'a str {
        match self.language {
            Language::Vi => vietnamese,
            Language::En => english,
            Language::Ja => japanese,
        }
    }

    pub fn language_name(self, language: Language) -> &'static str {
        match language {
            Language::Vi => "Tiếng Việt",
            Language::En => "English",
            Language::Ja => "日本語",
        }
    }

    pub fn game_directory(self) -> &'static str {
        self.pick("Thư mục game", "Game directory", "ゲームフォルダ")
    }

    pub fn game_not_found(self) -> &'static str {
        self.pick(
            "Không tìm thấy game, hãy chọn thư mục thủ công",
            "Game not found, please select the folder manually",
            "ゲームが見つかりません。フォルダを手動で選択してください",
        )
    }

    pub fn game_version(self) -> &'static str {
        self.pick("Phiên bản game", "Game version", "ゲームバージョン")
    }

    pub fn translation(self) -> &'static str {
        self.pick("Bản dịch", "Translation", "翻訳パッチ")
    }

    pub fn not_installed(self) -> &'static str {
        self.pick("Chưa cài đặt", "Not installed", "未インストール")
    }

    pub fn installed_on(self, version: &str, date: &str) -> String {
        match self.language {
            Language::Vi => format!("{version} (cài ngày {date})"),
            Language::En => format!("{version} (installed {date})"),
            Language::Ja => format!("{version}（{date} にインストール）"),
        }
    }

    pub fn selected_release(self) -> &'static str {
        self.pick("Phiên bản đã chọn", "Selected release", "選択中のバージョン")
    }

    pub fn no_releases(self) -> &'static str {
        self.pick(
            "Chưa có danh sách phiên bản",
            "No releases available",
            "利用可能なバージョンがありません",
        )
    }

    pub fn stale_catalog(self, reason: &str) -> String {
        match self.language {
            Language::Vi => format!("Danh sách có thể đã cũ: {reason}"),
            Language::En => format!("Release list may be out of date: {reason}"),
            Language::Ja => format!("一覧が古い可能性があります: {reason}"),
        }
    }

    pub fn installed_tag(self) -> &'static str {
        self.pick("đang dùng", "installed", "インストール済み")
    }

    pub fn default_tag(self) -> &'static str {
        self.pick("mặc định", "default", "デフォルト")
    }

    pub fn downloads(self, count: u64) -> String {
        match self.language {
            Language::Vi => format!("{count} lượt tải"),
            Language::En => format!("{count} downloads"),
            Language::Ja => format!("{count} ダウンロード"),
        }
    }

    pub fn action_label(self, action: InstallAction) -> &'static str {
        match action {
            InstallAction::Install => self.pick("Cài đặt", "Install", "インストール"),
            InstallAction::Reinstall => self.pick("Cài lại", "Reinstall", "再インストール"),
            InstallAction::Update => self.pick("Cập nhật", "Update", "アップデート"),
        }
    }

    pub fn operation_done(self, kind: OperationKind) -> &'static str {
        match kind {
            OperationKind::Install => {
                self.pick("Cài đặt hoàn tất", "Installation complete", "インストール完了")
            }
            OperationKind::Update => {
                self.pick("Cập nhật hoàn tất", "Update complete", "アップデート完了")
            }
            OperationKind::Uninstall => {
                self.pick("Đã gỡ bản dịch", "Translation removed", "翻訳パッチを削除しました")
            }
        }
    }

    pub fn failed(self, reason: &str) -> String {
        match self.language {
            Language::Vi => format!("Thất bại: {reason}"),
            Language::En => format!("Failed: {reason}"),
            Language::Ja => format!("失敗しました: {reason}"),
        }
    }

    pub fn translation_update_available(self, version: &str) -> String {
        match self.language {
            Language::Vi => format!("Có bản dịch mới: {version}"),
            Language::En => format!("New translation available: {version}"),
            Language::Ja => format!("新しい翻訳パッチがあります: {version}"),
        }
    }

    pub fn app_update_available(self, version: &str, current: &str) -> String {
        match self.language {
            Language::Vi => format!("Có bản cập nhật {version} (đang dùng {current})"),
            Language::En => format!("Update {version} available (running {current})"),
            Language::Ja => format!("アップデート {version} があります（現在 {current}）"),
        }
    }

    pub fn app_up_to_date(self) -> &'static str {
        self.pick(
            "Ứng dụng đã là bản mới nhất",
            "The installer is up to date",
            "最新バージョンです",
        )
    }

    pub fn app_update_launched(self) -> &'static str {
        self.pick(
            "Đã tải xong, trình cài đặt đang chạy",
            "Download finished, the installer is starting",
            "ダウンロード完了。インストーラーを起動しています",
        )
    }

    pub fn yes_no(self, value: bool) -> &'static str {
        match value {
            true => self.pick("bật", "on", "オン"),
            false => self.pick("tắt", "off", "オフ"),
        }
    }

    pub fn setting_label(self, key: &str) -> &'static str {
        match key {
            "auto_update" => self.pick("Tự động cập nhật", "Auto update", "自動アップデート"),
            "auto_start" => self.pick("Khởi động cùng hệ thống", "Start with system", "自動起動"),
            "github_repo" => self.pick("Kho phát hành", "Release repository", "配布リポジトリ"),
            "check_update_on_startup" => self.pick(
                "Kiểm tra cập nhật khi mở",
                "Check for updates on startup",
                "起動時にアップデートを確認",
            ),
            "language" => self.pick("Ngôn ngữ", "Language", "言語"),
            _ => self.pick("Thiết lập", "Setting", "設定"),
        }
    }
}
