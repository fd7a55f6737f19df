/// Upload form. Streams the report into the page as it arrives and keeps the
/// submit button disabled while a request is outstanding.
pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="ko">
<head>
<meta charset="utf-8">
<title>AI 생기부 컨설턴트</title>
</head>
<body>
<h1>AI 생기부 컨설턴트</h1>
<form id="form">
  <label>희망 학과/진로 <input name="goal" placeholder="예: 컴퓨터공학과, 의예과" required></label>
  <label>생기부 PDF <input name="file" type="file" accept="application/pdf" required></label>
  <button id="submit" type="submit">분석 시작하기</button>
</form>
<p>개인정보 보호를 위해 파일은 분석 후 즉시 삭제됩니다.</p>
<pre id="result"></pre>
<script>
const form = document.getElementById("form");
const button = document.getElementById("submit");
const result = document.getElementById("result");

form.addEventListener("submit", async (event) => {
  event.preventDefault();
  if (button.disabled) return;
  button.disabled = true;
  result.textContent = "";
  try {
    const response = await fetch("/analyze", { method: "POST", body: new FormData(form) });
    if (!response.ok) {
      const body = await response.json().catch(() => ({ error: response.statusText }));
      result.textContent = "오류 발생: " + body.error;
      return;
    }
    const reader = response.body.getReader();
    const decoder = new TextDecoder();
    for (;;) {
      const { value, done } = await reader.read();
      if (done) break;
      result.textContent += decoder.decode(value, { stream: true });
    }
  } catch (e) {
    result.textContent += "\n오류 발생: " + e;
  } finally {
    button.disabled = false;
  }
});
</script>
</body>
</html>
"#;
