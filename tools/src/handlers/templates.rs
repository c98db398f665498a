//! Named Markdown form templates for **fill_form** (§4.8).

pub fn template_for(form_type: &str) -> Option<&'static str> {
    match form_type {
        "leave_request" => Some(LEAVE_REQUEST),
        "card_replacement" => Some(CARD_REPLACEMENT),
        "certificate_request" => Some(CERTIFICATE_REQUEST),
        "exam_review" => Some(EXAM_REVIEW),
        "general_request" => Some(GENERAL_REQUEST),
        _ => None,
    }
}

const LEAVE_REQUEST: &str = "\
# ĐƠN XIN NGHỈ PHÉP

Họ và tên: {name}
MSSV: {student_id}
Lớp: {class}
Lý do nghỉ: {reason}
Thời gian nghỉ: {time_period}

Người làm đơn
{name}
";

const CARD_REPLACEMENT: &str = "\
# ĐƠN ĐỀ NGHỊ CẤP LẠI THẺ SINH VIÊN

Họ và tên: {name}
MSSV: {student_id}
Khoa: {faculty}
Lý do cấp lại: {reason}
Số điện thoại liên hệ: {phone}

Người làm đơn
{name}
";

const CERTIFICATE_REQUEST: &str = "\
# ĐƠN XIN CẤP GIẤY CHỨNG NHẬN

Họ và tên: {name}
MSSV: {student_id}
Lớp: {class}
Loại giấy chứng nhận: {certificate_type}
Mục đích sử dụng: {purpose}

Người làm đơn
{name}
";

const EXAM_REVIEW: &str = "\
# ĐƠN XIN PHÚC KHẢO BÀI THI

Họ và tên: {name}
MSSV: {student_id}
Môn thi: {subject}
Ngày thi: {exam_date}
Lý do phúc khảo: {reason}

Người làm đơn
{name}
";

const GENERAL_REQUEST: &str = "\
# ĐƠN ĐỀ NGHỊ

Họ và tên: {name}
MSSV: {student_id}
Nội dung đề nghị: {content}

Người làm đơn
{name}
";
